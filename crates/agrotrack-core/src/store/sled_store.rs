//! sled-backed credential store.
//!
//! Layout:
//! - `principals`: id (u64 big-endian) -> JSON record
//! - `index:username`: username -> id
//! - `index:cedula`: cedula -> id

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};

use super::{
    CredentialStore, NewPrincipal, Principal, StoreConfig, StoreError, StoreResult,
    StoredPrincipal,
};
use crate::role::Role;

/// Tree name for principal records.
const PRINCIPALS_TREE: &str = "principals";

/// Tree name for the username unique index.
const USERNAME_INDEX_TREE: &str = "index:username";

/// Tree name for the cedula unique index.
const CEDULA_INDEX_TREE: &str = "index:cedula";

/// Credential store wrapping a sled database.
pub struct SledCredentialStore {
    db: Db,
    principals: Tree,
    by_username: Tree,
    by_cedula: Tree,
}

impl SledCredentialStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let db = config.to_sled_config().open()?;
        Self::from_db(db)
    }

    /// Open the store trees inside an existing sled database.
    pub fn from_db(db: Db) -> StoreResult<Self> {
        let principals = db.open_tree(PRINCIPALS_TREE)?;
        let by_username = db.open_tree(USERNAME_INDEX_TREE)?;
        let by_cedula = db.open_tree(CEDULA_INDEX_TREE)?;

        Ok(Self {
            db,
            principals,
            by_username,
            by_cedula,
        })
    }

    /// The underlying sled database, for collaborators that share it.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Number of stored principals.
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Check if no principal is stored.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn decode_id(bytes: &[u8]) -> StoreResult<u64> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StoreError::InvalidData(format!("bad id length {}", bytes.len())))?;
        Ok(u64::from_be_bytes(raw))
    }

    fn decode_record(id: u64, bytes: &[u8]) -> StoreResult<Principal> {
        let stored: StoredPrincipal = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::InvalidData(format!("principal {}: {}", id, e)))?;
        stored.into_principal(id)
    }

    fn encode_record(stored: &StoredPrincipal) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(stored).map_err(|e| StoreError::InvalidData(e.to_string()))
    }

    fn id_for_username(&self, username: &str) -> StoreResult<u64> {
        match self.by_username.get(username.as_bytes())? {
            Some(bytes) => Self::decode_id(&bytes),
            None => Err(StoreError::NotFound),
        }
    }
}

impl CredentialStore for SledCredentialStore {
    fn find_principal_by_username(&self, username: &str) -> StoreResult<Principal> {
        let id = self.id_for_username(username)?;
        self.find_principal_by_id(id)
    }

    fn find_principal_by_id(&self, id: u64) -> StoreResult<Principal> {
        match self.principals.get(id.to_be_bytes())? {
            Some(bytes) => Self::decode_record(id, &bytes),
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_principal(&self, principal: NewPrincipal) -> StoreResult<u64> {
        // Ids are allocated outside the transaction since the closure may retry.
        let id = self.db.generate_id()? + 1;
        let id_bytes = id.to_be_bytes();
        let record = Self::encode_record(&StoredPrincipal::from_new(&principal))?;

        let result: Result<(), TransactionError<StoreError>> =
            (&self.principals, &self.by_username, &self.by_cedula).transaction(
                |(principals_tx, username_tx, cedula_tx)| {
                    if username_tx.get(principal.username.as_bytes())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::UniqueViolation { field: "username" },
                        ));
                    }
                    if cedula_tx.get(principal.cedula.as_bytes())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::UniqueViolation { field: "cedula" },
                        ));
                    }

                    principals_tx.insert(&id_bytes, record.as_slice())?;
                    username_tx.insert(principal.username.as_bytes(), &id_bytes)?;
                    cedula_tx.insert(principal.cedula.as_bytes(), &id_bytes)?;
                    Ok(())
                },
            );

        match result {
            Ok(()) => {
                tracing::debug!(id, username = %principal.username, "principal inserted");
                Ok(id)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Storage(e)),
        }
    }

    fn update_role(&self, username: &str, role: Role) -> StoreResult<()> {
        let id = self.id_for_username(username)?;
        let key = id.to_be_bytes();

        let result: Result<(), TransactionError<StoreError>> =
            self.principals.transaction(|principals_tx| {
                let bytes = principals_tx
                    .get(key)?
                    .ok_or(ConflictableTransactionError::Abort(StoreError::NotFound))?;
                let mut stored: StoredPrincipal = serde_json::from_slice(&bytes).map_err(|e| {
                    ConflictableTransactionError::Abort(StoreError::InvalidData(e.to_string()))
                })?;
                stored.role = role.as_str().to_string();
                let encoded =
                    Self::encode_record(&stored).map_err(ConflictableTransactionError::Abort)?;
                principals_tx.insert(&key, encoded)?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Storage(e)),
        }
    }

    fn list_principals(&self) -> StoreResult<Vec<Principal>> {
        let mut principals = Vec::with_capacity(self.principals.len());
        for entry in self.principals.iter() {
            let (key, value) = entry?;
            let id = Self::decode_id(&key)?;
            principals.push(Self::decode_record(id, &value)?);
        }
        Ok(principals)
    }
}
