mod cli;
mod logging;
mod server;
mod session;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::initialize(&cli.log_level, cli.log_file.as_deref());
    server::run(cli).await
}
