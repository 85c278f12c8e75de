//! Core data types for zoom / pan / tilt navigation.

use serde::{Deserialize, Serialize};

/// Abstraction level of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Micro,
    Entity,
    #[default]
    Unit,
    Text,
    Community,
    Corpus,
}

impl ZoomLevel {
    pub const ALL: [ZoomLevel; 6] = [
        ZoomLevel::Micro,
        ZoomLevel::Entity,
        ZoomLevel::Unit,
        ZoomLevel::Text,
        ZoomLevel::Community,
        ZoomLevel::Corpus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomLevel::Micro => "micro",
            ZoomLevel::Entity => "entity",
            ZoomLevel::Unit => "unit",
            ZoomLevel::Text => "text",
            ZoomLevel::Community => "community",
            ZoomLevel::Corpus => "corpus",
        }
    }

    /// Parse an exact zoom name. Free text is rejected.
    pub fn parse(value: &str) -> ZptResult<Self> {
        Self::ALL
            .into_iter()
            .find(|z| z.as_str() == value)
            .ok_or_else(|| ZptError::InvalidZoom(value.to_string()))
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|z| z.as_str()).collect()
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representation style of navigation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiltStyle {
    #[default]
    Keywords,
    Embedding,
    Graph,
    Temporal,
}

impl TiltStyle {
    pub const ALL: [TiltStyle; 4] = [
        TiltStyle::Keywords,
        TiltStyle::Embedding,
        TiltStyle::Graph,
        TiltStyle::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TiltStyle::Keywords => "keywords",
            TiltStyle::Embedding => "embedding",
            TiltStyle::Graph => "graph",
            TiltStyle::Temporal => "temporal",
        }
    }

    pub fn parse(value: &str) -> ZptResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| ZptError::InvalidTilt(value.to_string()))
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl std::fmt::Display for TiltStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive time window. Bounds are RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl TemporalRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Geographic restriction on corpuscles carrying a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeographicFilter {
    BoundingBox {
        bbox: [f64; 4],
    },
    Radius {
        center: GeoPoint,
        #[serde(rename = "radius")]
        radius_km: f64,
    },
}

impl GeographicFilter {
    pub fn contains(&self, point: GeoPoint) -> bool {
        match self {
            // [min_lon, min_lat, max_lon, max_lat]
            GeographicFilter::BoundingBox { bbox } => {
                point.lon >= bbox[0]
                    && point.lat >= bbox[1]
                    && point.lon <= bbox[2]
                    && point.lat <= bbox[3]
            }
            GeographicFilter::Radius { center, radius_km } => {
                haversine_km(*center, point) <= *radius_km
            }
        }
    }
}

fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// The pan filter set. Each slot is independent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PanFilters {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geographic: Option<GeographicFilter>,
}

impl PanFilters {
    /// Sum of element counts across domains, keywords and entities.
    pub fn filter_count(&self) -> usize {
        self.domains.len() + self.keywords.len() + self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter_count() == 0 && self.temporal.is_none() && self.geographic.is_none()
    }
}

/// A partial pan: `None` leaves a slot untouched, `Some(empty)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanUpdate {
    pub domains: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub entities: Option<Vec<String>>,
    pub temporal: Option<Option<TemporalRange>>,
    pub geographic: Option<Option<GeographicFilter>>,
}

impl PanUpdate {
    pub fn is_empty(&self) -> bool {
        self.domains.is_none()
            && self.keywords.is_none()
            && self.entities.is_none()
            && self.temporal.is_none()
            && self.geographic.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tokenizer {
    #[default]
    Cl100k,
    P50k,
    Claude,
    Llama,
}

impl Tokenizer {
    /// Average characters per token used for budget estimates.
    pub fn chars_per_token(&self) -> f64 {
        match self {
            Tokenizer::Cl100k => 4.0,
            Tokenizer::P50k => 3.8,
            Tokenizer::Claude => 3.5,
            Tokenizer::Llama => 3.7,
        }
    }

    pub fn estimate(&self, text: &str) -> usize {
        let chars = text.chars().count() as f64;
        (chars / self.chars_per_token()).ceil() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Semantic,
    Adaptive,
    Fixed,
    Sentence,
}

pub const DEFAULT_MAX_TOKENS: usize = 4000;
pub const MAX_TOKENS_LIMIT: usize = 100_000;

/// How selected content is shaped before it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub tokenizer: Tokenizer,
    #[serde(default)]
    pub chunk_strategy: ChunkStrategy,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_true() -> bool {
    true
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            format: OutputFormat::default(),
            tokenizer: Tokenizer::default(),
            chunk_strategy: ChunkStrategy::default(),
            include_metadata: true,
        }
    }
}

impl TransformOptions {
    pub fn validate(&self) -> ZptResult<()> {
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_LIMIT {
            return Err(ZptError::InvalidTransform(format!(
                "maxTokens must be between 1 and {MAX_TOKENS_LIMIT}, got {}",
                self.max_tokens
            )));
        }
        Ok(())
    }
}

/// Complete navigation parameter set for one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationParameters {
    pub zoom: ZoomLevel,
    pub pan: PanFilters,
    pub tilt: TiltStyle,
    pub transform: TransformOptions,
}

/// A similarity match result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: u64,
    pub similarity: f32,
}

/// Errors raised by the navigation core.
#[derive(thiserror::Error, Debug)]
pub enum ZptError {
    #[error("Invalid zoom level: {0}")]
    InvalidZoom(String),

    #[error("Invalid tilt representation: {0}")]
    InvalidTilt(String),

    #[error("Invalid pan filter: {0}")]
    InvalidPan(String),

    #[error("Invalid transform options: {0}")]
    InvalidTransform(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Memory item not found: {0}")]
    ItemNotFound(u64),

    #[error("Project context not found: {0}")]
    ProjectNotFound(String),

    #[error("No recent interactions available for topic derivation")]
    NoRecentInteractions,

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Generation response invalid: {0}")]
    InvalidGeneration(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Memory limit exceeded: {0}")]
    ResourceExhausted(String),
}

impl ZptError {
    /// Stable catalog code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ZptError::InvalidZoom(_) => "INVALID_ZOOM_LEVEL",
            ZptError::InvalidTilt(_) => "INVALID_TILT_REPRESENTATION",
            ZptError::InvalidPan(_) => "INVALID_PAN_FILTER",
            ZptError::InvalidTransform(_) => "INVALID_TRANSFORM_OPTIONS",
            ZptError::MissingParameter(_) => "MISSING_REQUIRED_PARAMETER",
            ZptError::InvalidParameter { .. } => "PARAMETER_VALIDATION_FAILED",
            ZptError::ItemNotFound(_) => "MEMORY_ITEM_NOT_FOUND",
            ZptError::ProjectNotFound(_) => "PROJECT_CONTEXT_NOT_FOUND",
            ZptError::NoRecentInteractions => "NO_RECENT_INTERACTIONS",
            ZptError::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            ZptError::InvalidGeneration(_) => "LLM_RESPONSE_INVALID",
            ZptError::Embedding(_) => "EMBEDDING_GENERATION_FAILED",
            ZptError::ServiceUnavailable(_) => "EXTERNAL_SERVICE_UNAVAILABLE",
            ZptError::Timeout(_) => "OPERATION_TIMEOUT",
            ZptError::ResourceExhausted(_) => "MEMORY_LIMIT_EXCEEDED",
        }
    }

    /// Name of the offending argument, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ZptError::InvalidZoom(_) => Some("zoom"),
            ZptError::InvalidTilt(_) => Some("tilt"),
            ZptError::InvalidPan(_) => Some("pan"),
            ZptError::InvalidTransform(_) => Some("transform"),
            ZptError::MissingParameter(name) => Some(name),
            ZptError::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Convenience result type.
pub type ZptResult<T> = Result<T, ZptError>;
