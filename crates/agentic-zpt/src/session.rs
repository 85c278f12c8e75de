//! Per-session navigation state and its transitions.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::validate_temporal;
use crate::types::{
    NavigationParameters, PanFilters, PanUpdate, TiltStyle, TransformOptions, ZoomLevel,
    ZptError, ZptResult,
};

pub const DEFAULT_HISTORY_SIZE: usize = 50;
pub const DEFAULT_RECENT_INTERACTIONS: usize = 100;

/// Counters describing what a session has touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCache {
    pub interactions: u64,
    pub concepts: u64,
    pub embeddings: u64,
    pub size_bytes: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self {
            interactions: 0,
            concepts: 0,
            embeddings: 0,
            size_bytes: 0,
            last_updated: Utc::now(),
        }
    }
}

/// One navigation step, recorded after every ZPT transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub verb: String,
    pub zoom: ZoomLevel,
    pub tilt: TiltStyle,
    pub filter_count: usize,
}

/// A recent exchange kept for topic derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// Mutable state of one navigation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub zpt: NavigationParameters,
    pub cache: SessionCache,
    pub history: VecDeque<HistoryEntry>,
    pub recent_interactions: VecDeque<Interaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_project: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectContext>,
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "default_history_size")]
    history_size: usize,
    #[serde(skip, default = "default_interaction_capacity")]
    interaction_capacity: usize,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_limits(session_id, DEFAULT_HISTORY_SIZE, DEFAULT_RECENT_INTERACTIONS)
    }

    pub fn with_limits(
        session_id: impl Into<String>,
        history_size: usize,
        interaction_capacity: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            zpt: NavigationParameters::default(),
            cache: SessionCache::default(),
            history: VecDeque::new(),
            recent_interactions: VecDeque::new(),
            active_project: None,
            projects: Vec::new(),
            created_at: Utc::now(),
            history_size: history_size.max(1),
            interaction_capacity: interaction_capacity.max(1),
        }
    }

    /// Set the zoom level. The other axes are not consulted.
    pub fn set_zoom(&mut self, level: ZoomLevel) -> ZoomLevel {
        let previous = self.zpt.zoom;
        self.zpt.zoom = level;
        self.record("zoom");
        previous
    }

    pub fn set_tilt(&mut self, style: TiltStyle) -> TiltStyle {
        let previous = self.zpt.tilt;
        self.zpt.tilt = style;
        self.record("tilt");
        previous
    }

    pub fn set_transform(&mut self, transform: TransformOptions) -> ZptResult<()> {
        transform.validate()?;
        self.zpt.transform = transform;
        Ok(())
    }

    /// Apply a pan. Supplied slots replace, absent slots stay, empty clears.
    pub fn apply_pan(&mut self, update: PanUpdate) -> ZptResult<&PanFilters> {
        if let Some(Some(range)) = &update.temporal {
            validate_temporal(range.start.as_deref(), range.end.as_deref())?;
        }
        if let Some(Some(crate::types::GeographicFilter::Radius { radius_km, .. })) =
            &update.geographic
        {
            if *radius_km <= 0.0 {
                return Err(ZptError::InvalidPan(
                    "geographic radius must be positive".to_string(),
                ));
            }
        }

        let pan = &mut self.zpt.pan;
        if let Some(domains) = update.domains {
            pan.domains = clean(domains);
        }
        if let Some(keywords) = update.keywords {
            pan.keywords = clean(keywords);
        }
        if let Some(entities) = update.entities {
            pan.entities = clean(entities);
        }
        if let Some(temporal) = update.temporal {
            pan.temporal = temporal.filter(|t| !t.is_empty());
        }
        if let Some(geographic) = update.geographic {
            pan.geographic = geographic;
        }
        self.record("pan");
        Ok(&self.zpt.pan)
    }

    pub fn record_interaction(&mut self, interaction: Interaction, size_bytes: usize) {
        self.cache.interactions += 1;
        self.cache.embeddings += 1;
        self.cache.concepts += interaction.concepts.len() as u64;
        self.cache.size_bytes += size_bytes as u64;
        self.cache.last_updated = Utc::now();

        self.recent_interactions.push_front(interaction);
        self.recent_interactions.truncate(self.interaction_capacity);
    }

    /// Last `n` interactions, most recent first.
    pub fn last_interactions(&self, n: usize) -> Vec<&Interaction> {
        self.recent_interactions.iter().take(n).collect()
    }

    pub fn touch_cache(&mut self, concepts: usize, embeddings: usize) {
        self.cache.concepts += concepts as u64;
        self.cache.embeddings += embeddings as u64;
        self.cache.last_updated = Utc::now();
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    fn record(&mut self, verb: &str) {
        self.history.push_front(HistoryEntry {
            timestamp: Utc::now(),
            verb: verb.to_string(),
            zoom: self.zpt.zoom,
            tilt: self.zpt.tilt,
            filter_count: self.zpt.pan.filter_count(),
        });
        self.history.truncate(self.history_size);
    }

    pub fn project(&self, id: &str) -> Option<&ProjectContext> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut ProjectContext> {
        self.projects.iter_mut().find(|p| p.id == id)
    }
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

fn default_interaction_capacity() -> usize {
    DEFAULT_RECENT_INTERACTIONS
}

fn clean(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let v = v.trim().to_string();
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemporalRange;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pan_replaces_only_supplied_slots() {
        let mut state = SessionState::new("s1");
        state
            .apply_pan(PanUpdate {
                domains: Some(strings(&["a", "b"])),
                ..Default::default()
            })
            .unwrap();
        state
            .apply_pan(PanUpdate {
                keywords: Some(strings(&["c"])),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(state.zpt.pan.domains, strings(&["a", "b"]));
        assert_eq!(state.zpt.pan.keywords, strings(&["c"]));
        assert_eq!(state.zpt.pan.filter_count(), 3);
    }

    #[test]
    fn pan_replace_is_not_merge() {
        let mut state = SessionState::new("s1");
        state
            .apply_pan(PanUpdate {
                domains: Some(strings(&["a", "b"])),
                ..Default::default()
            })
            .unwrap();
        state
            .apply_pan(PanUpdate {
                domains: Some(strings(&["z"])),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(state.zpt.pan.domains, strings(&["z"]));
    }

    #[test]
    fn empty_slot_clears() {
        let mut state = SessionState::new("s1");
        state
            .apply_pan(PanUpdate {
                entities: Some(strings(&["Ada"])),
                temporal: Some(Some(TemporalRange {
                    start: Some("2024-01-01".into()),
                    end: None,
                })),
                ..Default::default()
            })
            .unwrap();
        state
            .apply_pan(PanUpdate {
                entities: Some(vec![]),
                temporal: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert!(state.zpt.pan.entities.is_empty());
        assert!(state.zpt.pan.temporal.is_none());
    }

    #[test]
    fn bad_temporal_leaves_state_untouched() {
        let mut state = SessionState::new("s1");
        let err = state
            .apply_pan(PanUpdate {
                keywords: Some(strings(&["x"])),
                temporal: Some(Some(TemporalRange {
                    start: Some("2025-01-01".into()),
                    end: Some("2024-01-01".into()),
                })),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PAN_FILTER");
        assert!(state.zpt.pan.keywords.is_empty());
    }

    #[test]
    fn history_is_bounded_and_most_recent_first() {
        let mut state = SessionState::with_limits("s1", 3, 10);
        for level in ZoomLevel::ALL {
            state.set_zoom(level);
        }
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[0].zoom, ZoomLevel::Corpus);
        assert_eq!(state.history[2].zoom, ZoomLevel::Text);
    }

    #[test]
    fn interactions_update_cache() {
        let mut state = SessionState::with_limits("s1", 5, 2);
        for i in 0..3 {
            state.record_interaction(
                Interaction {
                    prompt: format!("p{i}"),
                    response: None,
                    concepts: vec!["c".into()],
                    timestamp: Utc::now(),
                },
                10,
            );
        }
        assert_eq!(state.cache.interactions, 3);
        assert_eq!(state.cache.concepts, 3);
        assert_eq!(state.recent_interactions.len(), 2);
        assert_eq!(state.last_interactions(1)[0].prompt, "p2");
    }
}
