use std::sync::Arc;

use moddocs::{
    AppState, Config, app, auth, db,
    files::{Disks, LocalDisk, S3Disk},
    mail::{LogMailer, Mailer, SmtpMailer},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,moddocs=debug")))
        .init();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url).await?;
    let clients = auth::Clients::load(&config.oauth_clients_path, &config.app_url)?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => Arc::new(LogMailer),
    };

    let s3 = match &config.s3 {
        Some(s3) => Some(S3Disk::connect(s3).await?),
        None => None,
    };
    let disks = Disks::new(LocalDisk::new(&config.storage_root), s3);

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        db_pool,
        clients,
        config: Arc::new(config),
        mailer,
        disks,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
