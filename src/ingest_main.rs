//! Admin entry point: `sdc-ingest [ingest|audit] [--no-upload]`.

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};

use sdc_backend::core::config::{AppPaths, ConfigService};
use sdc_backend::core::logging;
use sdc_backend::rag::{
    open_text_store, CorpusAudit, EmbeddingProvider, FileTextExtractor, GcsObjectStore,
    IngestOptions, IngestionPipeline, TextStore,
};

enum Command {
    Ingest { upload: bool },
    Audit,
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut command = None;
    let mut upload = true;
    for arg in args {
        match arg.as_str() {
            "--no-upload" => upload = false,
            "ingest" | "audit" if command.is_none() => command = Some(arg.clone()),
            other => bail!("unexpected argument '{}'; usage: sdc-ingest [ingest|audit] [--no-upload]", other),
        }
    }
    Ok(match command.as_deref() {
        Some("audit") => Command::Audit,
        _ => Command::Ingest { upload },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths.log_dir);
    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;

    let store = open_text_store(&settings, &paths);

    match command {
        Command::Audit => {
            let counts = store
                .count_by_source()
                .await
                .context("Failed to read the text store")?;
            let audit = CorpusAudit::from_counts(counts);
            println!("{}", serde_json::to_string_pretty(&audit)?);
        }
        Command::Ingest { upload } => {
            let mut options = IngestOptions::from_settings(&settings, &paths);
            options.upload = upload;

            let pipeline = IngestionPipeline::new(
                Arc::new(EmbeddingProvider::from_settings(&settings)),
                store,
                Arc::new(GcsObjectStore::new(&settings)),
                Arc::new(FileTextExtractor),
                options,
            );
            let report = pipeline.run().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(err) = &report.error {
                bail!("ingestion failed: {}", err);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_ingest_with_upload() {
        assert!(matches!(parse_args(&[]).unwrap(), Command::Ingest { upload: true }));
    }

    #[test]
    fn parses_audit_and_no_upload() {
        assert!(matches!(parse_args(&args(&["audit"])).unwrap(), Command::Audit));
        assert!(matches!(
            parse_args(&args(&["ingest", "--no-upload"])).unwrap(),
            Command::Ingest { upload: false }
        ));
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(parse_args(&args(&["reindex"])).is_err());
        assert!(parse_args(&args(&["audit", "ingest"])).is_err());
    }
}
