// `docsync ls`: list documents.

use clap::Args;
use docsync_common::types::Document;
use serde::Serialize;

use super::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LsResult {
    pub documents: Vec<DocEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocEntry {
    pub id: String,
    pub title: String,
    pub chars: usize,
    pub fingerprint: Option<String>,
}

impl From<&Document> for DocEntry {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.to_string(),
            title: doc.display_title().to_string(),
            chars: doc.content.as_deref().map_or(0, |c| c.chars().count()),
            fingerprint: doc.fingerprint.as_ref().map(|f| f.as_str().to_owned()),
        }
    }
}

pub async fn run(args: LsArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match ctx.documents() {
        Ok(documents) => documents.list().await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(docs) => {
            let result = LsResult { documents: docs.iter().map(DocEntry::from).collect() };
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents.".into();
    }

    let mut lines = Vec::new();
    lines.push(format!("{} document(s)", result.documents.len()));
    for d in &result.documents {
        lines.push(format!("  {}  {} ({} chars)", d.id, d.title, d.chars));
    }
    lines.join("\n")
}
