//! Ingestion pipeline: source documents -> chunks -> embeddings -> stores.
//!
//! Documents and batches are processed strictly in sequence with a fixed
//! pause before each embedding call. Every successfully embedded batch is
//! appended to the JSON-lines batch file (`{id, embedding}` per line) and
//! upserted into the text store. Failed batches are skipped and accounted
//! for in the [`IngestReport`]; the run itself never fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::chunker::{split_into_chunks, Chunk, ChunkingConfig};
use super::embedding::EmbeddingProvider;
use super::error::RagError;
use super::extract::{list_documents, SourceDocument, TextExtractor};
use super::store::TextStore;
use super::upload::ObjectStore;
use crate::core::config::{AppPaths, Settings};

pub const BATCH_FILE_NAME: &str = "embeddings.json";

/// One line of the batch file the vector index is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
    /// Fixed pause before every embedding call.
    pub pacing: Duration,
    pub object_name: String,
    pub upload: bool,
}

impl IngestOptions {
    pub fn from_settings(settings: &Settings, paths: &AppPaths) -> Self {
        let ingest = &settings.ingest;
        Self {
            source_dir: paths.resolve(&ingest.source_dir),
            output_dir: paths.resolve(&ingest.output_dir),
            chunking: ChunkingConfig {
                chunk_size: ingest.chunk_size,
                chunk_overlap: ingest.chunk_overlap,
            },
            batch_size: ingest.batch_size.max(1),
            pacing: Duration::from_millis(ingest.pacing_ms),
            object_name: settings.storage.object_name.clone(),
            upload: true,
        }
    }

    pub fn batch_file(&self) -> PathBuf {
        self.output_dir.join(BATCH_FILE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub file_name: String,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub documents_found: usize,
    pub documents_ingested: usize,
    pub documents_skipped: Vec<SkippedDocument>,
    pub chunks_attempted: usize,
    pub chunks_embedded: usize,
    pub chunks_dropped: usize,
    pub chunks_stored: usize,
    pub batches_skipped: usize,
    pub store_failures: usize,
    pub batch_file: Option<PathBuf>,
    pub uploaded_object: Option<String>,
    /// Why the batch file was not uploaded, when it wasn't.
    pub upload_skipped: Option<String>,
    /// Set when the run could not get past setup (missing source dir, unwritable output).
    pub error: Option<String>,
}

impl IngestReport {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            documents_found: 0,
            documents_ingested: 0,
            documents_skipped: Vec::new(),
            chunks_attempted: 0,
            chunks_embedded: 0,
            chunks_dropped: 0,
            chunks_stored: 0,
            batches_skipped: 0,
            store_failures: 0,
            batch_file: None,
            uploaded_object: None,
            upload_skipped: None,
            error: None,
        }
    }

    /// True when every attempted chunk reached both the batch file and the store.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
            && self.chunks_dropped == 0
            && self.store_failures == 0
            && self.chunks_stored == self.chunks_attempted
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        tracing::info!(
            documents = self.documents_found,
            ingested = self.documents_ingested,
            skipped = self.documents_skipped.len(),
            attempted = self.chunks_attempted,
            embedded = self.chunks_embedded,
            dropped = self.chunks_dropped,
            stored = self.chunks_stored,
            store_failures = self.store_failures,
            "Ingestion finished"
        );
        if self.chunks_dropped > 0 {
            tracing::warn!(
                "{} of {} chunks were dropped; the corpus is incomplete",
                self.chunks_dropped,
                self.chunks_attempted
            );
        }
        self
    }
}

pub struct IngestionPipeline {
    embedder: Arc<EmbeddingProvider>,
    store: Arc<dyn TextStore>,
    object_store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<EmbeddingProvider>,
        store: Arc<dyn TextStore>,
        object_store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        options: IngestOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            object_store,
            extractor,
            options,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    pub async fn run(&self) -> IngestReport {
        let mut report = IngestReport::start();

        let documents = match list_documents(&self.options.source_dir) {
            Ok(documents) => documents,
            Err(err) => {
                tracing::error!(
                    "Cannot read source directory {}: {}",
                    self.options.source_dir.display(),
                    err
                );
                report.error = Some(format!("source directory unavailable: {}", err));
                return report.finish();
            }
        };
        report.documents_found = documents.len();
        if documents.is_empty() {
            tracing::info!("No documents found in {}", self.options.source_dir.display());
            return report.finish();
        }

        let batch_path = self.options.batch_file();
        let mut writer = match open_batch_file(&batch_path).await {
            Ok(writer) => writer,
            Err(err) => {
                tracing::error!("Cannot create batch file {}: {}", batch_path.display(), err);
                report.error = Some(format!("batch file unavailable: {}", err));
                return report.finish();
            }
        };

        for document in &documents {
            self.ingest_document(document, &mut writer, &mut report)
                .await;
        }

        if let Err(err) = writer.flush().await {
            tracing::error!("Failed to flush batch file: {}", err);
            report.error = Some(format!("batch file flush failed: {}", err));
            return report.finish();
        }
        drop(writer);
        tracing::info!("Generated embeddings in {}", batch_path.display());
        report.batch_file = Some(batch_path.clone());

        if !self.options.upload {
            report.upload_skipped = Some("upload disabled".to_string());
        } else if report.chunks_embedded == 0 {
            tracing::warn!("No chunks were embedded, not uploading an empty batch file");
            report.upload_skipped = Some("no chunks were embedded".to_string());
        } else {
            match self.upload(&batch_path).await {
                Ok(uri) => report.uploaded_object = Some(uri),
                Err(reason) => report.upload_skipped = Some(reason),
            }
        }

        report.finish()
    }

    async fn ingest_document(
        &self,
        document: &SourceDocument,
        writer: &mut BufWriter<tokio::fs::File>,
        report: &mut IngestReport,
    ) {
        tracing::info!("Processing {}...", document.path.display());

        let text = match self.extract(&document.path).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("No text extracted from {}, skipping", document.file_name);
                report.documents_skipped.push(SkippedDocument {
                    file_name: document.file_name.clone(),
                    reason: "no extractable text".to_string(),
                });
                return;
            }
            Err(err) => {
                tracing::warn!("Error reading {}: {}", document.file_name, err);
                report.documents_skipped.push(SkippedDocument {
                    file_name: document.file_name.clone(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        let chunks = split_into_chunks(&text, &document.file_name, &self.options.chunking);
        report.documents_ingested += 1;

        for batch in chunks.chunks(self.options.batch_size) {
            report.chunks_attempted += batch.len();
            let first = batch[0].start_offset;

            tokio::time::sleep(self.options.pacing).await;

            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await;
            if embeddings.is_empty() {
                tracing::warn!(
                    "Skipping batch starting at offset {} of {} due to embedding failure",
                    first,
                    document.file_name
                );
                report.batches_skipped += 1;
                report.chunks_dropped += batch.len();
                continue;
            }

            if let Err(err) = write_records(writer, batch, embeddings).await {
                tracing::error!(
                    "Failed to append batch at offset {} of {}: {}",
                    first,
                    document.file_name,
                    err
                );
                report.batches_skipped += 1;
                report.chunks_dropped += batch.len();
                continue;
            }
            report.chunks_embedded += batch.len();

            match self.store.upsert_chunks(batch).await {
                Ok(stored) => report.chunks_stored += stored,
                Err(err) => {
                    tracing::error!(
                        "Failed to store text for batch at offset {} of {}: {}",
                        first,
                        document.file_name,
                        err
                    );
                    report.store_failures += 1;
                }
            }

            tracing::info!(
                "  Processed {} chunks of {} from offset {}",
                batch.len(),
                document.file_name,
                first
            );
        }
    }

    async fn extract(&self, path: &Path) -> Result<String, RagError> {
        let extractor = self.extractor.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| RagError::Extraction(format!("extraction task failed: {}", e)))?
    }

    async fn upload(&self, batch_path: &Path) -> Result<String, String> {
        match self
            .object_store
            .upload_file(batch_path, &self.options.object_name)
            .await
        {
            Ok(uri) => {
                tracing::info!("Uploaded {} to {}", batch_path.display(), uri);
                Ok(uri)
            }
            Err(RagError::NotConfigured(what)) => {
                tracing::warn!("{} not set, skipping batch file upload", what);
                Err(format!("{} not set", what))
            }
            Err(err) => {
                tracing::error!("Failed to upload batch file: {}", err);
                Err(format!("upload failed: {}", err))
            }
        }
    }
}

async fn open_batch_file(path: &Path) -> Result<BufWriter<tokio::fs::File>, RagError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = tokio::fs::File::create(path).await?;
    Ok(BufWriter::new(file))
}

async fn write_records(
    writer: &mut BufWriter<tokio::fs::File>,
    batch: &[Chunk],
    embeddings: Vec<Vec<f32>>,
) -> Result<(), RagError> {
    let mut lines = String::new();
    for (chunk, embedding) in batch.iter().zip(embeddings) {
        let record = EmbeddingRecord {
            id: chunk.id.clone(),
            embedding,
        };
        lines.push_str(&serde_json::to_string(&record)?);
        lines.push('\n');
    }
    writer.write_all(lines.as_bytes()).await?;
    Ok(())
}
