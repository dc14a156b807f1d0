use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrotrack_core::{AuthService, NewAccount, Role, SledCredentialStore, StoreConfig};
use agrotrack_server::{
    config::{resolve_auth_config, Args, Command, CreateAdminArgs, ServerConfig},
    create_router,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "agrotrack_server={level},agrotrack_core={level},agrotrack::audit=info,tower_http=info"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &args.command {
        Command::Serve(serve) => {
            let config = ServerConfig::from_args(&args, serve)?;
            run_server(config).await
        }
        Command::CreateAdmin(admin) => create_admin(&args, admin),
    }
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let listen_addr = config.listen_addr();
    let (state, audit_writer) = AppState::open(config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("AgroTrack server listening on http://{}", listen_addr);
    tracing::info!("Health check at http://{}/health", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;

    // The router owned the last state clone; the writer drains and exits.
    audit_writer.await?;
    Ok(())
}

fn create_admin(args: &Args, admin: &CreateAdminArgs) -> anyhow::Result<()> {
    let auth_config = resolve_auth_config(args.jwt_secret.as_deref())?;
    let store = Arc::new(SledCredentialStore::open(&StoreConfig::new(&args.data_dir))?);
    let auth = AuthService::new(store.clone(), auth_config);

    let account = NewAccount::new(
        &admin.username,
        &admin.password,
        &admin.nombre,
        &admin.apellido,
        &admin.cedula,
    );
    let id = auth.create_account(&account, Role::Admin)?;
    store.flush()?;

    tracing::info!(id, username = %admin.username, "administrator created");
    println!("Created administrator '{}' with id {}", admin.username, id);
    Ok(())
}
