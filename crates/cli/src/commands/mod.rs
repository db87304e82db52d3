// CLI subcommand dispatch.

use anyhow::Context;
use clap::Subcommand;
use docsync_engine::config::EngineConfig;
use docsync_engine::documents::Documents;
use docsync_engine::store::HttpStore;

pub mod edit;
pub mod ls;
pub mod new;
pub mod rm;
pub mod show;

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty document and print its id
    New(new::NewArgs),
    /// List documents, most recently updated first
    Ls(ls::LsArgs),
    /// Print one document
    Show(show::ShowArgs),
    /// Delete a document
    Rm(rm::RmArgs),
    /// Edit a document interactively with autosave
    Edit(edit::EditArgs),
}

/// Settings shared by every command.
pub struct CliContext {
    pub config: EngineConfig,
}

impl CliContext {
    /// Config file values, with `--server` taking precedence.
    pub fn load(server_override: Option<String>) -> Self {
        let mut config = EngineConfig::load();
        if let Some(server) = server_override {
            config.server_url = server;
        }
        Self { config }
    }

    pub fn documents(&self) -> anyhow::Result<Documents<HttpStore>> {
        let store = HttpStore::new(&self.config.server_url)
            .with_context(|| format!("invalid server url `{}`", self.config.server_url))?;
        Ok(Documents::new(store))
    }
}

pub async fn run(cmd: Command, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        Command::New(args) => new::run(args, ctx).await,
        Command::Ls(args) => ls::run(args, ctx).await,
        Command::Show(args) => show::run(args, ctx).await,
        Command::Rm(args) => rm::run(args, ctx).await,
        Command::Edit(args) => edit::run(args, ctx).await,
    }
}
