// `docsync rm`: delete a document.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use super::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document id.
    pub id: Uuid,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RmResult {
    pub id: Uuid,
    pub deleted: bool,
}

pub async fn run(args: RmArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match ctx.documents() {
        Ok(documents) => documents
            .delete(args.id)
            .await
            .with_context(|| format!("failed to delete document {}", args.id)),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            output::print_output(format, &RmResult { id: args.id, deleted: true }, |r| {
                format!("Deleted {}", r.id)
            })?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}
