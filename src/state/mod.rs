use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::content::ContentEngine;
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::core::errors::ApiError;
use crate::llm::{LlmClient, OpenAiProvider};
use crate::rag::{
    open_text_store, EmbeddingProvider, FileTextExtractor, GcsObjectStore, IngestOptions,
    IngestReport, IngestionPipeline, Retriever, TextStore, VectorIndexClient, VertexVectorIndex,
};

pub mod error;

use error::InitializationError;

/// Shared application state for the HTTP handlers.
///
/// Every external client inside is lazy, so building the state never touches
/// the network or the database.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub store: Arc<dyn TextStore>,
    pub retriever: Retriever,
    pub ingestion: Arc<IngestionPipeline>,
    pub content: ContentEngine,
    ingest_lock: Arc<Mutex<()>>,
    last_report: Arc<RwLock<Option<IngestReport>>>,
}

impl AppState {
    /// Loads configuration from disk and environment and wires the components.
    pub fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config.load_settings()?;
        Ok(Arc::new(Self::from_settings(settings, paths)))
    }

    pub fn from_settings(settings: Settings, paths: Arc<AppPaths>) -> Self {
        let embedder = Arc::new(EmbeddingProvider::from_settings(&settings));
        let store = open_text_store(&settings, &paths);
        let index = VectorIndexClient::new(Arc::new(VertexVectorIndex::new(&settings)));
        let retriever = Retriever::new(embedder.clone(), index, store.clone());

        let ingestion = Arc::new(IngestionPipeline::new(
            embedder,
            store.clone(),
            Arc::new(GcsObjectStore::new(&settings)),
            Arc::new(FileTextExtractor),
            IngestOptions::from_settings(&settings, &paths),
        ));

        let llm = LlmClient::new(Arc::new(OpenAiProvider::new(&settings)));
        let content = ContentEngine::new(llm, retriever.clone(), &settings);

        Self::with_components(Arc::new(settings), paths, store, retriever, ingestion, content)
    }

    pub fn with_components(
        settings: Arc<Settings>,
        paths: Arc<AppPaths>,
        store: Arc<dyn TextStore>,
        retriever: Retriever,
        ingestion: Arc<IngestionPipeline>,
        content: ContentEngine,
    ) -> Self {
        Self {
            paths,
            settings,
            store,
            retriever,
            ingestion,
            content,
            ingest_lock: Arc::new(Mutex::new(())),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Starts ingestion on a background task. Only one run at a time.
    pub fn start_ingestion(&self) -> Result<(), ApiError> {
        let guard = self
            .ingest_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| ApiError::Conflict("Ingestion is already running".to_string()))?;

        let pipeline = self.ingestion.clone();
        let last_report = self.last_report.clone();
        tokio::spawn(async move {
            tracing::info!("Starting background ingestion");
            let report = pipeline.run().await;
            *last_report.write().await = Some(report);
            drop(guard);
        });
        Ok(())
    }

    pub fn ingestion_running(&self) -> bool {
        self.ingest_lock.try_lock().is_err()
    }

    pub async fn last_report(&self) -> Option<IngestReport> {
        self.last_report.read().await.clone()
    }
}
