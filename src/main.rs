use clap::Parser;
use log::info;

use shroud_tracker::bootstrap::app::setup;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app = setup(args.config.as_deref()).await?;

    let jobs = shroud_tracker::app::start(&app).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    for job in jobs {
        let _ = job.await;
    }

    info!("goodbye.");
    Ok(())
}
