//! CGT Timeline MCP Server - Main Entry Point
//!
//! This is the main entry point for the CGT timeline MCP server application.
//! The actual implementation is in the `cgt_timeline_mcp` library.

use anyhow::Result;
use cgt_timeline_mcp::CgtTimelineHandler;
use cgt_timeline_mcp::history::DEFAULT_HISTORY_LIMIT;
use clap::{CommandFactory, Parser};
use mcp_attr::server::serve_stdio;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// CGT Timeline MCP Server - property timelines for capital gains tax via Model Context Protocol
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the timeline data file
    file: String,

    /// Enable git synchronization on save
    #[arg(long)]
    sync_git: bool,

    /// Number of edits kept for undo (0 disables undo)
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        // No arguments provided, show help and exit with error code
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!(); // Add a newline after help
        std::process::exit(2);
    }

    let args = Args::parse();

    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cgt_timeline_mcp={},info", args.log_level).into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(file = %args.file, sync_git = args.sync_git, "starting CGT timeline server");
    let handler = CgtTimelineHandler::new(&args.file, args.sync_git)?
        .with_history_limit(args.history_limit);
    serve_stdio(handler).await?;
    Ok(())
}
