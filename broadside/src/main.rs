use broadside::{AppContext, Server};
use broadside_common::{Signal, config::Config};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    broadside_common::logging::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "broadside.config.toml".to_string());
    let config = Config::from_file(&config_path)?;

    let context = AppContext::new(config)?;
    let (shutdown, _) = broadcast::channel::<Signal>(8);

    let workers = context.spawn_workers(&shutdown);
    let server = Server::bind(&context.config.server.listen_address, context.router()).await?;
    let serving = tokio::spawn(server.serve(shutdown.subscribe()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    // Not-yet-started sends are skipped; in-flight sends complete and log.
    context.cancel.cancel();
    let _ = shutdown.send(Signal::Shutdown);

    serving.await??;
    for worker in workers {
        let _ = worker.await;
    }

    Ok(())
}
