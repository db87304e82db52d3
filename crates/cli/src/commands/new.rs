// `docsync new`: create an empty document.

use anyhow::Context;
use clap::Args;
use docsync_common::patch::SavePatch;
use docsync_common::types::{title_field, CreatedDocument};

use super::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Optional initial title.
    #[arg(long)]
    title: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: NewArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match create(&args, ctx).await {
        Ok(created) => {
            output::print_output(format, &created, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn create(args: &NewArgs, ctx: &CliContext) -> anyhow::Result<CreatedDocument> {
    let documents = ctx.documents()?;
    let created = documents.create().await.context("failed to create document")?;

    if let Some(title) = args.title.as_deref() {
        let patch = SavePatch::new(created.id).with_title(title_field(title));
        documents.save(&patch).await.context("failed to set title")?;
    }

    Ok(created)
}

fn format_human(created: &CreatedDocument) -> String {
    created.id.to_string()
}
