//! Query-time retrieval: embed the query, rank by the vector index, then
//! resolve the ranked IDs to passage text.

use std::sync::Arc;

use serde::Serialize;

use super::embedding::EmbeddingProvider;
use super::index::VectorIndexClient;
use super::store::TextStore;

/// How a search ended; exposed on the debug endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Passages,
    /// No neighbour ID could be resolved; the raw IDs were returned.
    BareIds,
    EmbeddingFailed,
    NoNeighbors,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchTrace {
    pub query: String,
    pub k: usize,
    pub neighbor_ids: Vec<String>,
    pub missing_ids: Vec<String>,
    pub passages: Vec<String>,
    pub outcome: SearchOutcome,
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<EmbeddingProvider>,
    index: VectorIndexClient,
    store: Arc<dyn TextStore>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<EmbeddingProvider>,
        index: VectorIndexClient,
        store: Arc<dyn TextStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
        }
    }

    /// Up to `k` passages, most relevant first. Never fails; see [`SearchOutcome`].
    pub async fn search(&self, query: &str, k: usize) -> Vec<String> {
        self.search_traced(query, k).await.passages
    }

    pub async fn search_traced(&self, query: &str, k: usize) -> SearchTrace {
        let mut trace = SearchTrace {
            query: query.to_string(),
            k,
            neighbor_ids: Vec::new(),
            missing_ids: Vec::new(),
            passages: Vec::new(),
            outcome: SearchOutcome::EmbeddingFailed,
        };

        let embedding = self.embedder.embed_one(query).await;
        if embedding.is_empty() {
            tracing::warn!("Query embedding unavailable, returning no passages");
            return trace;
        }

        trace.neighbor_ids = self.index.find_neighbors(&embedding, k).await;
        if trace.neighbor_ids.is_empty() {
            trace.outcome = SearchOutcome::NoNeighbors;
            return trace;
        }

        let found = match self.store.fetch_by_ids(&trace.neighbor_ids).await {
            Ok(found) => found,
            Err(err) => {
                tracing::error!("Error fetching passages from text store: {}", err);
                Default::default()
            }
        };

        for id in &trace.neighbor_ids {
            match found.get(id) {
                Some(content) => trace.passages.push(content.clone()),
                None => trace.missing_ids.push(id.clone()),
            }
        }

        if trace.passages.is_empty() {
            tracing::warn!(
                "None of {} neighbour IDs resolved to text, returning IDs",
                trace.neighbor_ids.len()
            );
            trace.passages = trace.neighbor_ids.clone();
            trace.outcome = SearchOutcome::BareIds;
        } else {
            if !trace.missing_ids.is_empty() {
                tracing::debug!(missing = ?trace.missing_ids, "Some neighbour IDs have no stored text");
            }
            trace.outcome = SearchOutcome::Passages;
        }

        trace
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::rag::embedding::tests::ScriptedBackend;
    use crate::rag::embedding::RetryPolicy;
    use crate::rag::error::RagError;
    use crate::rag::index::VectorIndex;
    use crate::rag::store::tests::MemoryTextStore;

    /// Index that returns a fixed ranking truncated to `k`, or a fixed HTTP failure.
    pub(crate) struct FixedIndex {
        pub ranking: Vec<String>,
        pub failure: Option<u16>,
        pub seen: Mutex<Vec<(Vec<f32>, usize)>>,
    }

    impl FixedIndex {
        pub(crate) fn new(ids: &[&str]) -> Self {
            Self {
                ranking: ids.iter().map(|s| s.to_string()).collect(),
                failure: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(status: u16) -> Self {
            Self {
                failure: Some(status),
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn find_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<String>, RagError> {
            self.seen.lock().unwrap().push((query.to_vec(), k));
            if let Some(status) = self.failure {
                return Err(RagError::Provider {
                    status,
                    message: "index unavailable".to_string(),
                });
            }
            Ok(self.ranking.iter().take(k).cloned().collect())
        }
    }

    pub(crate) fn retriever_with(
        backend: ScriptedBackend,
        index: FixedIndex,
        store: Arc<MemoryTextStore>,
    ) -> Retriever {
        let embedder = Arc::new(EmbeddingProvider::new(
            Arc::new(backend),
            RetryPolicy {
                max_attempts: 1,
                base_delay: std::time::Duration::from_millis(1),
            },
        ));
        Retriever::new(embedder, VectorIndexClient::new(Arc::new(index)), store)
    }

    #[tokio::test]
    async fn passages_follow_index_ranking() {
        let store = Arc::new(MemoryTextStore::with_rows(&[
            ("a_0", "alpha", "a"),
            ("b_0", "bravo", "b"),
            ("c_0", "charlie", "c"),
        ]));
        let retriever = retriever_with(
            ScriptedBackend::default(),
            FixedIndex::new(&["c_0", "a_0", "b_0"]),
            store,
        );

        let trace = retriever.search_traced("landing stations", 3).await;
        assert_eq!(trace.passages, vec!["charlie", "alpha", "bravo"]);
        assert_eq!(trace.outcome, SearchOutcome::Passages);
    }

    #[tokio::test]
    async fn unresolved_ids_are_dropped_from_partial_matches() {
        let store = Arc::new(MemoryTextStore::with_rows(&[("b_0", "bravo", "b")]));
        let retriever = retriever_with(
            ScriptedBackend::default(),
            FixedIndex::new(&["gone_0", "b_0"]),
            store,
        );

        let trace = retriever.search_traced("q", 2).await;
        assert_eq!(trace.passages, vec!["bravo"]);
        assert_eq!(trace.missing_ids, vec!["gone_0"]);
    }

    #[tokio::test]
    async fn returns_bare_ids_when_nothing_resolves() {
        let store = Arc::new(MemoryTextStore::default());
        let retriever = retriever_with(
            ScriptedBackend::default(),
            FixedIndex::new(&["x_0", "y_900"]),
            store,
        );

        assert_eq!(retriever.search("q", 5).await, vec!["x_0", "y_900"]);
    }

    #[tokio::test]
    async fn store_outage_falls_back_to_ids() {
        let store = Arc::new(MemoryTextStore::with_rows(&[("x_0", "text", "x")]));
        store.set_offline(true);
        let retriever = retriever_with(ScriptedBackend::default(), FixedIndex::new(&["x_0"]), store);

        let trace = retriever.search_traced("q", 1).await;
        assert_eq!(trace.passages, vec!["x_0"]);
        assert_eq!(trace.outcome, SearchOutcome::BareIds);
    }

    #[tokio::test]
    async fn embedding_failure_skips_index() {
        let index = FixedIndex::new(&["x_0"]);
        let store = Arc::new(MemoryTextStore::with_rows(&[("x_0", "text", "x")]));
        let backend = ScriptedBackend::failing_with(vec![RagError::Provider {
            status: 400,
            message: "bad request".to_string(),
        }]);
        let retriever = retriever_with(backend, index, store);

        let trace = retriever.search_traced("q", 3).await;
        assert!(trace.passages.is_empty());
        assert!(trace.neighbor_ids.is_empty());
        assert_eq!(trace.outcome, SearchOutcome::EmbeddingFailed);
    }

    #[tokio::test]
    async fn index_error_returns_nothing_without_touching_the_store() {
        let store = Arc::new(MemoryTextStore::with_rows(&[("x_0", "text", "x")]));
        let retriever = retriever_with(
            ScriptedBackend::default(),
            FixedIndex::failing(503),
            store.clone(),
        );

        let trace = retriever.search_traced("q", 3).await;
        assert!(trace.passages.is_empty());
        assert!(trace.neighbor_ids.is_empty());
        assert_eq!(trace.outcome, SearchOutcome::NoNeighbors);
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn empty_ranking_returns_nothing_without_touching_the_store() {
        let store = Arc::new(MemoryTextStore::with_rows(&[("x_0", "text", "x")]));
        let retriever = retriever_with(ScriptedBackend::default(), FixedIndex::new(&[]), store.clone());

        let trace = retriever.search_traced("q", 3).await;
        assert!(trace.passages.is_empty());
        assert_eq!(trace.outcome, SearchOutcome::NoNeighbors);
        assert_eq!(store.fetch_count(), 0);
        assert!(retriever.search("q", 3).await.is_empty());
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn k_is_passed_to_index() {
        let store = Arc::new(MemoryTextStore::default());
        let index = Arc::new(FixedIndex::new(&["a_0", "b_0", "c_0"]));
        let embedder = Arc::new(EmbeddingProvider::new(
            Arc::new(ScriptedBackend::default()),
            RetryPolicy::default(),
        ));
        let retriever = Retriever::new(embedder, VectorIndexClient::new(index.clone()), store);

        let ids = retriever.search("four", 2).await;
        assert_eq!(ids.len(), 2);
        let seen = index.seen.lock().unwrap();
        assert_eq!(seen[0], (vec![4.0, 1.0], 2));
    }
}
