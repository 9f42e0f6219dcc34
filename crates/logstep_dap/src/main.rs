//! Logstep debug adapter binary
//!
//! Speaks the debug adapter protocol on stdin/stdout. Diagnostics go to stderr.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::Result;
use clap::Parser;
use logstep_dap::DapServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logstep-dap")]
#[command(about = "Replay debugger adapter for debug logs", long_about = None)]
struct Args {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "logstep=info")]
    log_filter: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut server = DapServer::new();
    server.run(tokio::io::stdin(), tokio::io::stdout()).await?;

    Ok(())
}
