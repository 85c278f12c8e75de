//! Per-session navigation state, memory, and the capabilities verbs call.

use std::sync::Arc;
use std::time::Instant;

use agentic_zpt::{
    ConceptExtractor, EmbeddingProvider, HashingEmbedder, KeywordConceptExtractor, MemoryStore,
    NavigationOutcome, NavigationParameters, NavigationPreview, SessionState, TextGenerator,
    UnavailableGenerator,
};

use crate::config::{SessionConfig, TopicConfig, ZptConfig};
use crate::types::McpResult;

/// Capabilities and settings shared by every session.
pub struct ZptServices {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn TextGenerator>,
    pub extractor: Arc<dyn ConceptExtractor>,
    pub session: SessionConfig,
    pub topic: TopicConfig,
}

impl ZptServices {
    /// Local-only capabilities: hashing embeddings, keyword concepts, and no
    /// text generator.
    pub fn local(config: &ZptConfig) -> Self {
        Self {
            embedder: Arc::new(HashingEmbedder::new(config.session.embedding_dim)),
            generator: Arc::new(UnavailableGenerator),
            extractor: Arc::new(KeywordConceptExtractor::default()),
            session: config.session.clone(),
            topic: config.topic.clone(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ConceptExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_topic(mut self, topic: TopicConfig) -> Self {
        self.topic = topic;
        self
    }
}

/// One navigation session: its ZPT state and its memory corpus.
pub struct ZptSessionManager {
    state: SessionState,
    store: MemoryStore,
    services: Arc<ZptServices>,
    started: Instant,
    verb_count: u64,
}

impl ZptSessionManager {
    pub fn new(session_id: &str, services: Arc<ZptServices>) -> Self {
        let state = SessionState::with_limits(
            session_id,
            services.session.history_size,
            services.session.recent_interactions_capacity,
        );
        let store = MemoryStore::new(services.session.embedding_dim);

        tracing::info!("Session '{session_id}' started");

        Self {
            state,
            store,
            services,
            started: Instant::now(),
            verb_count: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    /// Both halves at once, for verbs that touch state and memory together.
    pub fn parts_mut(&mut self) -> (&mut SessionState, &mut MemoryStore) {
        (&mut self.state, &mut self.store)
    }

    pub fn services(&self) -> &ZptServices {
        &self.services
    }

    pub async fn embed(&self, text: &str) -> McpResult<Vec<f32>> {
        Ok(self.services.embedder.generate_embedding(text).await?)
    }

    pub async fn extract_concepts(&self, text: &str) -> McpResult<Vec<String>> {
        Ok(self.services.extractor.extract_concepts(text).await?)
    }

    /// Run a navigation pass under the current ZPT state.
    pub async fn navigate(&self, query: Option<&str>) -> McpResult<NavigationOutcome> {
        let embedding = self.query_embedding(query).await?;
        Ok(agentic_zpt::navigate(
            &self.store,
            &self.state.zpt,
            query,
            embedding.as_deref(),
        ))
    }

    /// Estimate a navigation under `params` without touching session state.
    pub async fn preview(
        &self,
        params: &NavigationParameters,
        query: Option<&str>,
    ) -> McpResult<NavigationPreview> {
        let embedding = self.query_embedding(query).await?;
        Ok(agentic_zpt::preview(
            &self.store,
            params,
            query,
            embedding.as_deref(),
        ))
    }

    async fn query_embedding(&self, query: Option<&str>) -> McpResult<Option<Vec<f32>>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => Ok(Some(self.embed(q).await?)),
            None => Ok(None),
        }
    }

    pub fn record_verb(&mut self) {
        self.verb_count += 1;
    }

    pub fn verb_count(&self) -> u64 {
        self.verb_count
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
