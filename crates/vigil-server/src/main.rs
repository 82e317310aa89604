use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use vigil_config::ConfigLoader;
use vigil_server::App;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "vigil.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config).load()?;
    vigil_logging::init_logging(&config.logging)?;

    tracing::info!("Starting Vigil with config: {}", args.config.display());

    let app = App::from_config(config)?;
    if args.check {
        tracing::info!(
            targets = app.publishers().len(),
            transports = app.transports().len(),
            "Configuration is valid"
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            tracing::info!("Received Ctrl+C, shutting down");
            cancel.cancel();
        });
    }

    app.run(cancel).await
}
