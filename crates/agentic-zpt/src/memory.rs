//! In-memory corpus of remembered items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::similarity::{cosine_similarity, find_similar};
use crate::types::{GeoPoint, PanFilters, SimilarityMatch, ZptError, ZptResult};

/// What kind of content an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Interaction,
    Document,
    Concept,
    Memory,
}

impl ItemKind {
    pub fn parse(value: &str) -> ZptResult<Self> {
        match value {
            "interaction" => Ok(ItemKind::Interaction),
            "document" => Ok(ItemKind::Document),
            "concept" => Ok(ItemKind::Concept),
            "memory" => Ok(ItemKind::Memory),
            other => Err(ZptError::InvalidParameter {
                name: "type".to_string(),
                reason: format!("unsupported type '{other}', expected interaction, document or concept"),
            }),
        }
    }
}

/// Memory domain an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryDomain {
    #[default]
    User,
    Project,
    Session,
    Instruction,
}

impl MemoryDomain {
    pub const ALL: [MemoryDomain; 4] = [
        MemoryDomain::User,
        MemoryDomain::Project,
        MemoryDomain::Session,
        MemoryDomain::Instruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryDomain::User => "user",
            MemoryDomain::Project => "project",
            MemoryDomain::Session => "session",
            MemoryDomain::Instruction => "instruction",
        }
    }

    pub fn parse(value: &str) -> ZptResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == value)
            .ok_or_else(|| ZptError::InvalidParameter {
                name: "domain".to_string(),
                reason: format!("unknown memory domain '{value}'"),
            })
    }
}

/// A stored unit of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub id: u64,
    pub content: String,
    pub kind: ItemKind,
    pub domain: MemoryDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub importance: f32,
    pub relevance: f32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

impl MemoryItem {
    pub fn new(content: impl Into<String>, kind: ItemKind, domain: MemoryDomain) -> Self {
        Self {
            id: 0,
            content: content.into(),
            kind,
            domain,
            domain_id: None,
            tags: Vec::new(),
            concepts: Vec::new(),
            embedding: Vec::new(),
            importance: 0.5,
            relevance: 1.0,
            created_at: Utc::now(),
            metadata: Value::Null,
        }
    }

    /// Location carried in `metadata.location`, if any.
    pub fn location(&self) -> Option<GeoPoint> {
        let loc = self.metadata.get("location")?;
        Some(GeoPoint {
            lat: loc.get("lat")?.as_f64()?,
            lon: loc.get("lon")?.as_f64()?,
        })
    }

    /// Whether this item passes every populated pan slot.
    pub fn matches_pan(&self, pan: &PanFilters) -> bool {
        if !pan.domains.is_empty() {
            let hit = pan.domains.iter().any(|d| {
                d.eq_ignore_ascii_case(self.domain.as_str())
                    || self.domain_id.as_deref().is_some_and(|id| id == d)
                    || self.tags.iter().any(|t| t.eq_ignore_ascii_case(d))
            });
            if !hit {
                return false;
            }
        }

        if !pan.keywords.is_empty() {
            let lower = self.content.to_lowercase();
            if !pan.keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
                return false;
            }
        }

        if !pan.entities.is_empty()
            && !pan.entities.iter().any(|e| {
                self.concepts.iter().any(|c| c.eq_ignore_ascii_case(e))
                    || self.content.to_lowercase().contains(&e.to_lowercase())
            })
        {
            return false;
        }

        if let Some(range) = &pan.temporal {
            if let Some(start) = parse_bound(range.start.as_deref()) {
                if self.created_at < start {
                    return false;
                }
            }
            if let Some(end) = parse_bound(range.end.as_deref()) {
                if self.created_at > end {
                    return false;
                }
            }
        }

        if let Some(geo) = &pan.geographic {
            match self.location() {
                Some(point) if geo.contains(point) => {}
                _ => return false,
            }
        }

        true
    }
}

fn parse_bound(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Validate that temporal bounds are parseable and ordered.
pub fn validate_temporal(start: Option<&str>, end: Option<&str>) -> ZptResult<()> {
    let s = match start {
        Some(v) => Some(
            parse_bound(Some(v))
                .ok_or_else(|| ZptError::InvalidPan(format!("unparseable temporal start '{v}'")))?,
        ),
        None => None,
    };
    let e = match end {
        Some(v) => Some(
            parse_bound(Some(v))
                .ok_or_else(|| ZptError::InvalidPan(format!("unparseable temporal end '{v}'")))?,
        ),
        None => None,
    };
    if let (Some(s), Some(e)) = (s, e) {
        if s > e {
            return Err(ZptError::InvalidPan(
                "temporal start is after temporal end".to_string(),
            ));
        }
    }
    Ok(())
}

/// Container for all remembered items of one session.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub items: Vec<MemoryItem>,
    pub embedding_dim: usize,
    pub next_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new(embedding_dim: usize) -> Self {
        let now = Utc::now();
        Self {
            items: Vec::new(),
            embedding_dim,
            next_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, id: u64) -> Option<&MemoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Add an item and return its assigned ID.
    pub fn add(&mut self, mut item: MemoryItem) -> u64 {
        let id = self.next_id;
        item.id = id;
        self.next_id += 1;
        self.updated_at = Utc::now();
        self.items.push(item);
        id
    }

    pub fn remove(&mut self, id: u64) -> ZptResult<MemoryItem> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(ZptError::ItemNotFound(id))?;
        self.updated_at = Utc::now();
        Ok(self.items.remove(pos))
    }

    /// Remove every item matching the predicate, returning how many went.
    pub fn remove_where(&mut self, pred: impl Fn(&MemoryItem) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !pred(i));
        let removed = before - self.items.len();
        if removed > 0 {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Multiply relevance of matching items by `(1 - factor)`.
    pub fn fade_where(&mut self, factor: f32, pred: impl Fn(&MemoryItem) -> bool) -> usize {
        let keep = (1.0 - factor).clamp(0.0, 1.0);
        let mut touched = 0;
        for item in self.items.iter_mut().filter(|i| pred(i)) {
            item.relevance *= keep;
            touched += 1;
        }
        if touched > 0 {
            self.updated_at = Utc::now();
        }
        touched
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.items
            .iter()
            .map(|i| i.content.len() + i.embedding.len() * std::mem::size_of::<f32>())
            .sum()
    }

    pub fn by_domain(&self, domain: MemoryDomain) -> Vec<&MemoryItem> {
        self.items.iter().filter(|i| i.domain == domain).collect()
    }

    /// Most recent items first.
    pub fn recent(&self, limit: usize) -> Vec<&MemoryItem> {
        let mut sorted: Vec<_> = self.items.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sorted.truncate(limit);
        sorted
    }

    /// Similarity search restricted to items that pass the pan filters.
    /// Scores are weighted by item relevance.
    pub fn search(
        &self,
        query: &[f32],
        pan: &PanFilters,
        limit: usize,
        threshold: f32,
    ) -> Vec<SimilarityMatch> {
        let candidates: Vec<&MemoryItem> =
            self.items.iter().filter(|i| i.matches_pan(pan)).collect();
        let mut matches = find_similar(query, &candidates, candidates.len(), f32::MIN);
        for m in matches.iter_mut() {
            if let Some(item) = self.get(m.id) {
                m.similarity *= item.relevance;
            }
        }
        matches.retain(|m| m.similarity >= threshold);
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        matches
    }

    /// Similarity of one stored item to a query vector.
    pub fn similarity_to(&self, id: u64, query: &[f32]) -> Option<f32> {
        self.get(id).map(|i| cosine_similarity(query, &i.embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemporalRange;

    fn item(content: &str, domain: MemoryDomain, embedding: Vec<f32>) -> MemoryItem {
        let mut i = MemoryItem::new(content, ItemKind::Interaction, domain);
        i.embedding = embedding;
        i
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut store = MemoryStore::new(2);
        assert_eq!(store.add(item("a", MemoryDomain::User, vec![1.0, 0.0])), 1);
        assert_eq!(store.add(item("b", MemoryDomain::User, vec![0.0, 1.0])), 2);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut store = MemoryStore::new(2);
        assert!(matches!(store.remove(9), Err(ZptError::ItemNotFound(9))));
    }

    #[test]
    fn search_respects_pan_domains() {
        let mut store = MemoryStore::new(2);
        store.add(item("rust ownership", MemoryDomain::Project, vec![1.0, 0.0]));
        store.add(item("rust lifetimes", MemoryDomain::User, vec![1.0, 0.1]));

        let pan = PanFilters {
            domains: vec!["project".into()],
            ..Default::default()
        };
        let hits = store.search(&[1.0, 0.0], &pan, 10, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn fade_lowers_search_scores() {
        let mut store = MemoryStore::new(2);
        store.add(item("alpha", MemoryDomain::User, vec![1.0, 0.0]));
        let faded = store.fade_where(0.5, |_| true);
        assert_eq!(faded, 1);
        let hits = store.search(&[1.0, 0.0], &PanFilters::default(), 1, 0.0);
        assert!((hits[0].similarity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn temporal_filter_excludes_older_items() {
        let mut old = item("old note", MemoryDomain::User, vec![]);
        old.created_at = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let pan = PanFilters {
            temporal: Some(TemporalRange {
                start: Some("2024-01-01".into()),
                end: None,
            }),
            ..Default::default()
        };
        assert!(!old.matches_pan(&pan));
    }

    #[test]
    fn temporal_validation_orders_bounds() {
        assert!(validate_temporal(Some("2024-01-01"), Some("2024-12-31")).is_ok());
        assert!(validate_temporal(Some("2025-01-01"), Some("2024-12-31")).is_err());
        assert!(validate_temporal(Some("yesterday"), None).is_err());
    }
}
