use anyhow::Result;
use clap::Parser;

use gator::commands::{self, AppContext, Cli};
use gator::config::default_config_dir;

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output on stdout stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_dir()?.join("config.toml"),
    };

    let mut ctx = AppContext::open(config_path).await?;
    let mut stdout = std::io::stdout().lock();
    let result = commands::run(&mut ctx, cli.command, &mut stdout).await;
    ctx.close().await;
    result
}
