//! Zoom / pan / tilt selection and token-budgeted transformation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::keywords::{extract_keywords, sentences};
use crate::memory::{MemoryItem, MemoryStore};
use crate::similarity::cosine_similarity;
use crate::topic::truncate_chars;
use crate::types::{
    ChunkStrategy, NavigationParameters, OutputFormat, PanFilters, TiltStyle, TransformOptions,
    ZoomLevel,
};

const SEMANTIC_CHUNK_TOKENS: usize = 512;
const FIXED_CHUNK_TOKENS: usize = 256;
const EMBEDDING_PREVIEW_DIMS: usize = 8;

/// An addressable unit produced at a given zoom level.
#[derive(Debug, Clone)]
struct Corpuscle {
    id: String,
    text: String,
    source_ids: Vec<u64>,
    concepts: Vec<String>,
    timestamp: DateTime<Utc>,
    embedding: Vec<f32>,
}

/// Result of a navigation pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub zoom: ZoomLevel,
    pub pan: PanFilters,
    pub tilt: TiltStyle,
    pub corpuscles: Vec<Value>,
    pub content: Vec<String>,
    pub token_count: usize,
    pub truncated: bool,
    pub matched_items: usize,
    pub total_items: usize,
}

/// Select, project, and transform corpus content for the given parameters.
pub fn navigate(
    store: &MemoryStore,
    params: &NavigationParameters,
    query: Option<&str>,
    query_embedding: Option<&[f32]>,
) -> NavigationOutcome {
    let selected = select_items(store, params, query, query_embedding);
    let corpuscles = corpuscles_at(params.zoom, &selected);
    let ordered = order_for_tilt(params.tilt, corpuscles);

    let (kept, content, token_count, truncated) = apply_transform(&params.transform, &ordered);
    let projected = project(params.tilt, &kept, query_embedding);

    tracing::debug!(
        zoom = %params.zoom,
        tilt = %params.tilt,
        matched = selected.len(),
        corpuscles = projected.len(),
        tokens = token_count,
        "navigation complete"
    );

    NavigationOutcome {
        query: query.map(str::to_string),
        zoom: params.zoom,
        pan: params.pan.clone(),
        tilt: params.tilt,
        corpuscles: projected,
        content,
        token_count,
        truncated,
        matched_items: selected.len(),
        total_items: store.count(),
    }
}

/// Cost estimate for a navigation without rendering its content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPreview {
    pub zoom: ZoomLevel,
    pub pan: PanFilters,
    pub tilt: TiltStyle,
    pub estimated_items: usize,
    pub estimated_corpuscles: usize,
    pub estimated_tokens: usize,
    pub within_budget: bool,
    pub sample: Vec<String>,
}

const PREVIEW_SAMPLE: usize = 3;
const PREVIEW_SAMPLE_CHARS: usize = 200;

pub fn preview(
    store: &MemoryStore,
    params: &NavigationParameters,
    query: Option<&str>,
    query_embedding: Option<&[f32]>,
) -> NavigationPreview {
    let selected = select_items(store, params, query, query_embedding);
    let corpuscles = corpuscles_at(params.zoom, &selected);
    let tokenizer = params.transform.tokenizer;
    let estimated_tokens = corpuscles
        .iter()
        .map(|c| tokenizer.estimate(&render(&params.transform, c)))
        .sum();

    NavigationPreview {
        zoom: params.zoom,
        pan: params.pan.clone(),
        tilt: params.tilt,
        estimated_items: selected.len(),
        estimated_corpuscles: corpuscles.len(),
        estimated_tokens,
        within_budget: estimated_tokens <= params.transform.max_tokens,
        sample: corpuscles
            .iter()
            .take(PREVIEW_SAMPLE)
            .map(|c| truncate_chars(&c.text, PREVIEW_SAMPLE_CHARS))
            .collect(),
    }
}

fn select_items<'a>(
    store: &'a MemoryStore,
    params: &NavigationParameters,
    query: Option<&str>,
    query_embedding: Option<&[f32]>,
) -> Vec<&'a MemoryItem> {
    let mut candidates: Vec<(&MemoryItem, f32)> = store
        .items
        .iter()
        .filter(|i| i.matches_pan(&params.pan))
        .map(|i| {
            let score = query_embedding
                .map(|q| cosine_similarity(q, &i.embedding) * i.relevance)
                .unwrap_or(i.relevance);
            (i, score)
        })
        .collect();

    if let Some(q) = query.map(str::to_lowercase).filter(|q| !q.trim().is_empty()) {
        candidates.retain(|(i, score)| *score > 0.0 || i.content.to_lowercase().contains(&q));
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    } else {
        candidates.sort_by(|a, b| {
            b.0.created_at
                .cmp(&a.0.created_at)
                .then(b.0.id.cmp(&a.0.id))
        });
    }

    candidates.into_iter().map(|(i, _)| i).collect()
}

fn corpuscles_at(zoom: ZoomLevel, items: &[&MemoryItem]) -> Vec<Corpuscle> {
    match zoom {
        ZoomLevel::Micro => items
            .iter()
            .flat_map(|item| {
                sentences(&item.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(n, s)| Corpuscle {
                        id: format!("item:{}#s{}", item.id, n + 1),
                        text: s,
                        source_ids: vec![item.id],
                        concepts: item.concepts.clone(),
                        timestamp: item.created_at,
                        embedding: item.embedding.clone(),
                    })
            })
            .collect(),

        ZoomLevel::Entity => {
            let mut by_concept: BTreeMap<String, Vec<&MemoryItem>> = BTreeMap::new();
            for item in items.iter().copied() {
                for concept in &item.concepts {
                    by_concept.entry(concept.to_lowercase()).or_default().push(item);
                }
            }
            let mut entities: Vec<Corpuscle> = by_concept
                .into_iter()
                .map(|(concept, sources)| group_corpuscle(format!("entity:{concept}"), concept, &sources))
                .collect();
            entities.sort_by(|a, b| b.source_ids.len().cmp(&a.source_ids.len()));
            entities
        }

        ZoomLevel::Unit => items
            .iter()
            .map(|item| {
                let summary = sentences(&item.content)
                    .into_iter()
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(" ");
                item_corpuscle(item, summary)
            })
            .collect(),

        ZoomLevel::Text => items
            .iter()
            .map(|item| item_corpuscle(item, item.content.clone()))
            .collect(),

        ZoomLevel::Community => {
            let mut groups: BTreeMap<String, Vec<&MemoryItem>> = BTreeMap::new();
            for item in items.iter().copied() {
                let key = item
                    .domain_id
                    .clone()
                    .or_else(|| item.tags.first().cloned())
                    .unwrap_or_else(|| item.domain.as_str().to_string());
                groups.entry(key).or_default().push(item);
            }
            groups
                .into_iter()
                .map(|(key, members)| {
                    let joined = joined_content(&members);
                    let keywords = extract_keywords(&joined, 5);
                    let text = format!(
                        "Community '{key}' ({} items): {}",
                        members.len(),
                        keywords.join(", ")
                    );
                    group_corpuscle(format!("community:{key}"), text, &members)
                })
                .collect()
        }

        ZoomLevel::Corpus => {
            if items.is_empty() {
                return Vec::new();
            }
            let joined = joined_content(items);
            let keywords = extract_keywords(&joined, 10);
            let mut domains: Vec<&str> = items.iter().map(|i| i.domain.as_str()).collect();
            domains.sort_unstable();
            domains.dedup();
            let text = format!(
                "Corpus of {} items across {} domains. Main themes: {}",
                items.len(),
                domains.len(),
                keywords.join(", ")
            );
            let mut corpus = group_corpuscle("corpus".to_string(), text, items);
            corpus.concepts = keywords;
            vec![corpus]
        }
    }
}

fn item_corpuscle(item: &MemoryItem, text: String) -> Corpuscle {
    Corpuscle {
        id: format!("item:{}", item.id),
        text,
        source_ids: vec![item.id],
        concepts: item.concepts.clone(),
        timestamp: item.created_at,
        embedding: item.embedding.clone(),
    }
}

fn group_corpuscle(id: String, text: String, members: &[&MemoryItem]) -> Corpuscle {
    let mut concepts: Vec<String> = Vec::new();
    for m in members {
        for c in &m.concepts {
            if !concepts.contains(c) {
                concepts.push(c.clone());
            }
        }
    }
    Corpuscle {
        id,
        text,
        source_ids: members.iter().map(|m| m.id).collect(),
        concepts,
        timestamp: members
            .iter()
            .map(|m| m.created_at)
            .max()
            .unwrap_or_else(Utc::now),
        embedding: mean_embedding(members),
    }
}

fn joined_content(items: &[&MemoryItem]) -> String {
    items
        .iter()
        .map(|i| i.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mean_embedding(members: &[&MemoryItem]) -> Vec<f32> {
    let vectors: Vec<&Vec<f32>> = members
        .iter()
        .map(|m| &m.embedding)
        .filter(|e| !e.is_empty())
        .collect();
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let dim = first.len();
    let mut mean = vec![0.0f32; dim];
    let mut counted = 0usize;
    for v in vectors.iter().filter(|v| v.len() == dim) {
        for (acc, x) in mean.iter_mut().zip(v.iter()) {
            *acc += x;
        }
        counted += 1;
    }
    let n = counted as f32;
    mean.iter_mut().for_each(|x| *x /= n);
    mean
}

fn order_for_tilt(tilt: TiltStyle, mut corpuscles: Vec<Corpuscle>) -> Vec<Corpuscle> {
    if tilt == TiltStyle::Temporal {
        corpuscles.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }
    corpuscles
}

fn render(transform: &TransformOptions, c: &Corpuscle) -> String {
    match (transform.format, transform.include_metadata) {
        (OutputFormat::Markdown, true) => format!("- **{}**: {}", c.id, c.text),
        (OutputFormat::Markdown, false) => format!("- {}", c.text),
        (OutputFormat::Structured, true) => {
            format!("{} | {} | {}", c.id, c.timestamp.to_rfc3339(), c.text)
        }
        (OutputFormat::Structured, false) | (OutputFormat::Json, _) => c.text.clone(),
    }
}

/// Render, budget, and chunk. Returns the corpuscles that fit.
fn apply_transform(
    transform: &TransformOptions,
    corpuscles: &[Corpuscle],
) -> (Vec<Corpuscle>, Vec<String>, usize, bool) {
    let tokenizer = transform.tokenizer;
    let mut kept = Vec::new();
    let mut pieces = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;

    for c in corpuscles {
        let rendered = render(transform, c);
        let cost = tokenizer.estimate(&rendered);
        if used + cost > transform.max_tokens {
            let remaining = transform.max_tokens.saturating_sub(used);
            if remaining > 0 {
                let chars = (remaining as f64 * tokenizer.chars_per_token()).floor() as usize;
                let cut = truncate_chars(&rendered, chars.saturating_sub(1));
                used += tokenizer.estimate(&cut);
                pieces.push(cut);
                kept.push(c.clone());
            }
            truncated = true;
            break;
        }
        used += cost;
        pieces.push(rendered);
        kept.push(c.clone());
    }

    let chunks = chunk(transform, &pieces);
    (kept, chunks, used, truncated)
}

fn chunk(transform: &TransformOptions, pieces: &[String]) -> Vec<String> {
    let tokenizer = transform.tokenizer;
    match transform.chunk_strategy {
        ChunkStrategy::Sentence => pieces.iter().flat_map(|p| sentences(p)).collect(),
        ChunkStrategy::Fixed => {
            let size = ((FIXED_CHUNK_TOKENS as f64) * tokenizer.chars_per_token()) as usize;
            let joined = pieces.join("\n");
            let chars: Vec<char> = joined.chars().collect();
            chars
                .chunks(size.max(1))
                .map(|c| c.iter().collect::<String>())
                .collect()
        }
        ChunkStrategy::Semantic | ChunkStrategy::Adaptive => {
            let limit = if transform.chunk_strategy == ChunkStrategy::Semantic {
                SEMANTIC_CHUNK_TOKENS
            } else {
                (transform.max_tokens / 8).max(128)
            };
            let mut chunks: Vec<String> = Vec::new();
            let mut current = String::new();
            for piece in pieces {
                let next_cost = tokenizer.estimate(&current) + tokenizer.estimate(piece);
                if !current.is_empty() && next_cost > limit {
                    chunks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(piece);
            }
            if !current.is_empty() {
                chunks.push(current);
            }
            chunks
        }
    }
}

fn project(tilt: TiltStyle, corpuscles: &[Corpuscle], query: Option<&[f32]>) -> Vec<Value> {
    match tilt {
        TiltStyle::Keywords => corpuscles
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "text": c.text,
                    "keywords": extract_keywords(&c.text, 5),
                })
            })
            .collect(),

        TiltStyle::Embedding => corpuscles
            .iter()
            .map(|c| {
                let preview: Vec<f32> = c
                    .embedding
                    .iter()
                    .take(EMBEDDING_PREVIEW_DIMS)
                    .map(|v| (v * 10_000.0).round() / 10_000.0)
                    .collect();
                json!({
                    "id": c.id,
                    "text": c.text,
                    "embedding": {
                        "dimensions": c.embedding.len(),
                        "preview": preview,
                    },
                    "similarity": query.map(|q| cosine_similarity(q, &c.embedding)),
                })
            })
            .collect(),

        TiltStyle::Graph => {
            let mut index: HashMap<String, Vec<&str>> = HashMap::new();
            for c in corpuscles {
                for concept in &c.concepts {
                    index.entry(concept.to_lowercase()).or_default().push(&c.id);
                }
            }
            corpuscles
                .iter()
                .map(|c| {
                    let mut connections: Vec<&str> = c
                        .concepts
                        .iter()
                        .flat_map(|k| index.get(&k.to_lowercase()).cloned().unwrap_or_default())
                        .filter(|id| *id != c.id)
                        .collect();
                    connections.sort_unstable();
                    connections.dedup();
                    json!({
                        "id": c.id,
                        "text": c.text,
                        "concepts": c.concepts,
                        "connections": connections,
                        "sources": c.source_ids,
                    })
                })
                .collect()
        }

        TiltStyle::Temporal => corpuscles
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "text": c.text,
                    "timestamp": c.timestamp.to_rfc3339(),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::memory::{ItemKind, MemoryDomain};

    fn store_with(texts: &[(&str, MemoryDomain, &[&str])]) -> MemoryStore {
        let embedder = HashingEmbedder::new(32);
        let mut store = MemoryStore::new(32);
        for (text, domain, concepts) in texts {
            let mut item = MemoryItem::new(*text, ItemKind::Document, *domain);
            item.embedding = embedder.embed_sync(text);
            item.concepts = concepts.iter().map(|c| c.to_string()).collect();
            store.add(item);
        }
        store
    }

    fn sample() -> MemoryStore {
        store_with(&[
            ("Rust has ownership. Borrowing is checked.", MemoryDomain::Project, &["rust", "ownership"][..]),
            ("Graph stores hold triples. SPARQL queries them.", MemoryDomain::User, &["graph", "sparql"][..]),
            ("Rust async uses futures.", MemoryDomain::Project, &["rust", "async"][..]),
        ])
    }

    #[test]
    fn mean_embedding_skips_mismatched_lengths() {
        let mut a = MemoryItem::new("a", ItemKind::Document, MemoryDomain::User);
        a.embedding = vec![1.0, 3.0];
        let mut b = MemoryItem::new("b", ItemKind::Document, MemoryDomain::User);
        b.embedding = vec![3.0, 5.0];
        let mut odd = MemoryItem::new("odd", ItemKind::Document, MemoryDomain::User);
        odd.embedding = vec![100.0, 100.0, 100.0];
        let empty = MemoryItem::new("empty", ItemKind::Document, MemoryDomain::User);

        let mean = mean_embedding(&[&a, &odd, &b, &empty]);
        assert_eq!(mean, vec![2.0, 4.0]);
        assert!(mean_embedding(&[&empty]).is_empty());
    }

    #[test]
    fn micro_zoom_splits_sentences() {
        let store = sample();
        let params = NavigationParameters {
            zoom: ZoomLevel::Micro,
            ..Default::default()
        };
        let out = navigate(&store, &params, None, None);
        assert_eq!(out.corpuscles.len(), 5);
        assert!(!out.truncated);
    }

    #[test]
    fn entity_zoom_groups_by_concept() {
        let store = sample();
        let params = NavigationParameters {
            zoom: ZoomLevel::Entity,
            tilt: TiltStyle::Graph,
            ..Default::default()
        };
        let out = navigate(&store, &params, None, None);
        assert_eq!(out.corpuscles[0]["id"], "entity:rust");
        assert_eq!(out.corpuscles[0]["sources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn pan_restricts_selection() {
        let store = sample();
        let params = NavigationParameters {
            zoom: ZoomLevel::Text,
            pan: PanFilters {
                domains: vec!["user".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let out = navigate(&store, &params, None, None);
        assert_eq!(out.matched_items, 1);
        assert_eq!(out.total_items, 3);
    }

    #[test]
    fn corpus_zoom_yields_single_overview() {
        let store = sample();
        let params = NavigationParameters {
            zoom: ZoomLevel::Corpus,
            ..Default::default()
        };
        let out = navigate(&store, &params, None, None);
        assert_eq!(out.corpuscles.len(), 1);
        assert!(out.content[0].starts_with("Corpus of 3 items across 2 domains"));
    }

    #[test]
    fn token_budget_truncates() {
        let store = sample();
        let mut params = NavigationParameters {
            zoom: ZoomLevel::Text,
            ..Default::default()
        };
        params.transform.max_tokens = 12;
        let out = navigate(&store, &params, None, None);
        assert!(out.truncated);
        assert!(out.token_count <= 12);
    }

    #[test]
    fn temporal_tilt_orders_oldest_first() {
        let mut store = sample();
        store.items[2].created_at = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let params = NavigationParameters {
            zoom: ZoomLevel::Text,
            tilt: TiltStyle::Temporal,
            ..Default::default()
        };
        let out = navigate(&store, &params, None, None);
        assert_eq!(out.corpuscles[0]["id"], "item:3");
    }

    #[test]
    fn preview_estimates_without_truncating() {
        let store = sample();
        let mut params = NavigationParameters {
            zoom: ZoomLevel::Text,
            ..Default::default()
        };
        params.transform.max_tokens = 10;
        let p = preview(&store, &params, None, None);
        assert_eq!(p.estimated_items, 3);
        assert_eq!(p.estimated_corpuscles, 3);
        assert!(!p.within_budget);
        assert_eq!(p.sample.len(), 3);
    }

    #[test]
    fn query_ranks_by_similarity() {
        let store = sample();
        let embedder = HashingEmbedder::new(32);
        let q = embedder.embed_sync("sparql graph triples");
        let params = NavigationParameters {
            zoom: ZoomLevel::Text,
            tilt: TiltStyle::Embedding,
            ..Default::default()
        };
        let out = navigate(&store, &params, Some("sparql graph triples"), Some(&q));
        assert_eq!(out.corpuscles[0]["id"], "item:2");
        assert!(out.corpuscles[0]["similarity"].as_f64().unwrap() > 0.0);
    }
}
