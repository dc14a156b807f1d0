use std::sync::Arc;

use tokio::task::JoinHandle;

use agrotrack_core::{
    AuditEvent, AuditLogger, AuthError, AuthResult, AuthService, Principal, Role,
    SledAuditLogger, SledCredentialStore, StoreConfig, TracingAuditLogger,
};

use crate::audit::{start_writer, AuditHandle, FanoutAuditLogger};
use crate::config::ServerConfig;
use crate::error::{ApiError, Error};

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub audit: AuditHandle,
    pub audit_log: Arc<SledAuditLogger>,
    pub config: ServerConfig,
}

impl AppState {
    /// Open the database and start the audit writer.
    ///
    /// The writer task ends once every clone of the state is dropped.
    pub fn open(config: ServerConfig) -> Result<(Self, JoinHandle<()>), Error> {
        let store_config = match &config.data_dir {
            Some(dir) => StoreConfig::new(dir),
            None => StoreConfig::temporary(),
        };
        let store = Arc::new(SledCredentialStore::open(&store_config)?);
        let audit_log = Arc::new(SledAuditLogger::open(store.db())?);

        let sink: Arc<dyn AuditLogger> = Arc::new(FanoutAuditLogger::new(vec![
            Arc::new(TracingAuditLogger),
            audit_log.clone(),
        ]));
        let (audit, writer) = start_writer(sink, config.audit_queue_capacity);

        let auth = Arc::new(AuthService::new(store, config.auth.clone()));
        tracing::info!(
            data_dir = ?config.data_dir,
            audit_queue_capacity = audit.capacity(),
            "application state opened"
        );

        Ok((
            Self {
                auth,
                audit,
                audit_log,
                config,
            },
            writer,
        ))
    }

    /// Run a blocking auth operation off the async workers.
    pub async fn run_auth<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&AuthService) -> AuthResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let auth = self.auth.clone();
        let result = tokio::task::spawn_blocking(move || f(&auth))
            .await
            .map_err(|e| ApiError::Internal(format!("auth task failed: {}", e)))?;
        result.map_err(ApiError::from)
    }

    /// Require `principal` to currently hold one of `accepted`.
    ///
    /// The role is looked up again rather than taken from the token, so a
    /// demotion takes effect on the next request. Refusals are audited.
    pub async fn require_role(
        &self,
        principal: &Principal,
        operation: &str,
        accepted: &'static [Role],
    ) -> Result<(), ApiError> {
        let username = principal.username.clone();
        let granted = self
            .run_auth(move |auth| auth.check_permission(&username, accepted))
            .await?;

        if granted {
            return Ok(());
        }

        tracing::info!(
            actor = %principal.username,
            operation,
            "access denied"
        );
        self.audit.record(AuditEvent::access_denied(
            &principal.username,
            operation,
            accepted,
        ));
        Err(AuthError::Forbidden.into())
    }
}
