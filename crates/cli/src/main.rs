// docsync CLI entry point.

use anyhow::Context;
use clap::Parser;

mod commands;
mod exit_code;
mod output;

use commands::CliContext;
use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "docsync", about = "Edit documents with autosave against a docsync server")]
struct Cli {
    /// Server base URL (overrides `server_url` in ~/.docsync/config.toml).
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> std::process::ExitCode {
    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => ExitCode::from_error(&error).into(),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = CliContext::load(cli.server);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::run(cli.command, &ctx))
}
