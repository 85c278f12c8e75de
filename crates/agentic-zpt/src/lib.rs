//! AgenticZPT: core library for zoom / pan / tilt navigation over a semantic memory corpus.

pub mod embedding;
pub mod keywords;
pub mod memory;
pub mod navigate;
pub mod providers;
pub mod session;
pub mod similarity;
pub mod topic;
pub mod types;

pub use embedding::{EmbeddingProvider, HashingEmbedder, EMBEDDING_DIM};
pub use memory::{ItemKind, MemoryDomain, MemoryItem, MemoryStore};
pub use navigate::{navigate, preview, NavigationOutcome, NavigationPreview};
pub use providers::{
    ConceptExtractor, GenerationOptions, KeywordConceptExtractor, TextGenerator,
    UnavailableGenerator,
};
pub use session::{Interaction, ProjectContext, ProjectStatus, SessionState};
pub use similarity::{cosine_similarity, find_similar};
pub use topic::{parse_topic_reply, TopicLabel};
pub use types::*;
