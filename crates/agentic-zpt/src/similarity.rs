//! Vector similarity search over memory embeddings.

use crate::memory::MemoryItem;
use crate::types::SimilarityMatch;

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Find the top-k most similar items by embedding.
pub fn find_similar(
    query: &[f32],
    items: &[&MemoryItem],
    top_k: usize,
    min_similarity: f32,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = items
        .iter()
        .filter(|i| !i.embedding.is_empty())
        .map(|i| SimilarityMatch {
            id: i.id,
            similarity: cosine_similarity(query, &i.embedding),
        })
        .filter(|m| m.similarity >= min_similarity)
        .collect();

    matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}
