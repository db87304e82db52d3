// `docsync show`: print one document.

use anyhow::Context;
use clap::Args;
use docsync_common::types::Document;
use uuid::Uuid;

use super::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id.
    pub id: Uuid,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ShowArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match ctx.documents() {
        Ok(documents) => documents
            .refresh(args.id)
            .await
            .with_context(|| format!("failed to fetch document {}", args.id)),
        Err(e) => Err(e),
    };

    match result {
        Ok(document) => {
            output::print_output(format, &document, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn format_human(document: &Document) -> String {
    let mut out = format!("# {}\n", document.display_title());
    if let Some(content) = document.content.as_deref() {
        out.push('\n');
        out.push_str(content);
    }
    out
}
