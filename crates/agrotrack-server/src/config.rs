//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};

use agrotrack_core::{AuthConfig, AuthError};

use crate::error::Error;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default capacity of the audit queue.
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

/// AgroTrack server command line arguments.
#[derive(Debug, Parser)]
#[command(name = "agrotrack-server")]
#[command(about = "AgroTrack authentication and user administration server")]
#[command(version)]
pub struct Args {
    /// Directory for the credential and audit database
    #[arg(long, global = true, default_value = "./agrotrack_data")]
    pub data_dir: PathBuf,

    /// HMAC secret for session tokens (falls back to AGROTRACK_JWT_SECRET)
    #[arg(long, global = true)]
    pub jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Debug, ClapArgs)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Session token lifetime in hours
    #[arg(long, default_value_t = 24)]
    pub token_ttl_hours: u64,

    /// Maximum queued audit events before new ones are dropped
    #[arg(long, default_value_t = DEFAULT_AUDIT_QUEUE_CAPACITY)]
    pub audit_queue_capacity: usize,
}

#[derive(Debug, ClapArgs)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub nombre: String,

    #[arg(long)]
    pub apellido: String,

    #[arg(long)]
    pub cedula: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Database directory. None opens a temporary in-memory database.
    pub data_dir: Option<PathBuf>,
    /// Auth core configuration.
    pub auth: AuthConfig,
    /// Capacity of the audit queue.
    pub audit_queue_capacity: usize,
}

impl ServerConfig {
    /// Create a configuration with defaults and the given auth settings.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
            auth,
            audit_queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
        }
    }

    /// Build the configuration for `serve`.
    pub fn from_args(args: &Args, serve: &ServeArgs) -> Result<Self, Error> {
        let auth = resolve_auth_config(args.jwt_secret.as_deref())?
            .with_token_ttl(Duration::from_secs(serve.token_ttl_hours * 60 * 60));

        Ok(Self {
            host: serve.host.clone(),
            port: serve.port,
            data_dir: Some(args.data_dir.clone()),
            auth,
            audit_queue_capacity: serve.audit_queue_capacity.max(1),
        })
    }

    /// Set the database directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the audit queue capacity.
    pub fn with_audit_queue_capacity(mut self, capacity: usize) -> Self {
        self.audit_queue_capacity = capacity.max(1);
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the signing secret from the CLI, falling back to the environment.
pub fn resolve_auth_config(cli_secret: Option<&str>) -> Result<AuthConfig, Error> {
    let config = match cli_secret {
        Some(secret) => AuthConfig::new(secret),
        None => AuthConfig::from_env(),
    };
    config.map_err(|e| match e {
        AuthError::Config(msg) => Error::Config(msg),
        other => Error::Config(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_args() {
        let args = Args::parse_from([
            "agrotrack-server",
            "--jwt-secret",
            "cli-secret",
            "serve",
            "--port",
            "9100",
            "--token-ttl-hours",
            "2",
        ]);
        let Command::Serve(ref serve) = args.command else {
            panic!("expected serve");
        };
        let config = ServerConfig::from_args(&args, serve).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.listen_addr(), "127.0.0.1:9100");
        assert_eq!(config.auth.token_ttl, Duration::from_secs(7200));
        assert_eq!(config.audit_queue_capacity, DEFAULT_AUDIT_QUEUE_CAPACITY);
        assert_eq!(config.data_dir, Some(PathBuf::from("./agrotrack_data")));
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let args = Args::parse_from([
            "agrotrack-server",
            "create-admin",
            "--username",
            "boss",
            "--password",
            "secret1",
            "--nombre",
            "B",
            "--apellido",
            "C",
            "--cedula",
            "000",
            "--data-dir",
            "/tmp/agro",
        ]);
        assert_eq!(args.data_dir, PathBuf::from("/tmp/agro"));
        assert!(matches!(args.command, Command::CreateAdmin(ref a) if a.username == "boss"));
    }

    #[test]
    fn test_empty_cli_secret_is_config_error() {
        assert!(matches!(resolve_auth_config(Some("")), Err(Error::Config(_))));
    }
}
