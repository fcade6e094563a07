use anyhow::Context;
use tracing_subscriber::EnvFilter;
use weatherhub_domain::time;
use weatherhubd::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        sources = config.sources.len(),
        metrics = config.metrics.len(),
        triggers = config.triggers.len(),
        "starting weatherhubd cycle"
    );

    let outcome = weatherhubd::run_once(&config, time::now())
        .await
        .context("running update cycle")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
