//! crates/sop_genius_core/src/studio.rs
//!
//! Client-side state for the studio panel: the per-(chat, tool) content
//! cache, the set of in-flight generations, and which detail view is open.
//! Transitions are inherent methods so their invariants (no duplicate
//! generation, view closes with its artifact) sit next to the data.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::domain::StudioArtifact;

/// The tool palette, in the order the panel renders it.
pub const STUDIO_TOOLS: [&str; 10] = [
    "audio",
    "video",
    "mindmap",
    "reports",
    "flashcards",
    "quiz",
    "infographic",
    "slides",
    "datatable",
    "notes",
];

/// What `generate` ultimately produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The content was already cached; no generation was started.
    Revealed,
    /// Generation ran and the content appeared within the poll budget.
    Ready,
    /// The poll budget ran out. The job may still finish server-side; a
    /// later artifact fetch can pick it up.
    TimedOut,
    /// A generation for this (chat, tool) pair was already in flight.
    AlreadyGenerating,
}

/// The immediate disposition of a generation request, before any polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginGeneration {
    CachedRevealed,
    AlreadyGenerating,
    Started,
}

#[derive(Debug, Clone, Default)]
pub struct StudioState {
    artifacts: HashMap<(String, String), Value>,
    generating: HashSet<(String, String)>,
    open_view: Option<(String, String)>,
}

impl StudioState {
    pub fn artifact(&self, chat_id: &str, tool_id: &str) -> Option<&Value> {
        self.artifacts
            .get(&(chat_id.to_string(), tool_id.to_string()))
    }

    pub fn is_generating(&self, chat_id: &str, tool_id: &str) -> bool {
        self.generating
            .contains(&(chat_id.to_string(), tool_id.to_string()))
    }

    /// The (chat, tool) pair whose detail view is open, if any.
    pub fn viewing(&self) -> Option<(&str, &str)> {
        self.open_view
            .as_ref()
            .map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// Tool ids with cached content for this chat, in palette order.
    pub fn cached_tools(&self, chat_id: &str) -> Vec<&str> {
        STUDIO_TOOLS
            .iter()
            .copied()
            .filter(|tool| self.artifact(chat_id, tool).is_some())
            .collect()
    }

    /// Caches a fetched artifact list (the initial panel load).
    pub fn load(&mut self, chat_id: &str, artifacts: Vec<StudioArtifact>) {
        for artifact in artifacts {
            self.artifacts
                .insert((chat_id.to_string(), artifact.tool_id), artifact.content);
        }
    }

    /// Decides what a generation request should do, and records a started
    /// one. Cached content is revealed instead of regenerated; a pair
    /// already generating is left alone.
    pub fn begin_generation(&mut self, chat_id: &str, tool_id: &str) -> BeginGeneration {
        let key = (chat_id.to_string(), tool_id.to_string());
        if self.artifacts.contains_key(&key) {
            self.open_view = Some(key);
            return BeginGeneration::CachedRevealed;
        }
        if !self.generating.insert(key) {
            return BeginGeneration::AlreadyGenerating;
        }
        BeginGeneration::Started
    }

    /// The polled content appeared: cache it, clear the in-flight mark and
    /// open its view.
    pub fn complete(&mut self, chat_id: &str, tool_id: &str, content: Value) {
        let key = (chat_id.to_string(), tool_id.to_string());
        self.generating.remove(&key);
        self.artifacts.insert(key.clone(), content);
        self.open_view = Some(key);
    }

    /// Clears the in-flight mark without caching anything (timeout or a
    /// failed start).
    pub fn settle(&mut self, chat_id: &str, tool_id: &str) {
        self.generating
            .remove(&(chat_id.to_string(), tool_id.to_string()));
    }

    /// Drops cached content; the detail view closes with it when it was
    /// showing this artifact.
    pub fn delete(&mut self, chat_id: &str, tool_id: &str) {
        let key = (chat_id.to_string(), tool_id.to_string());
        self.artifacts.remove(&key);
        if self.open_view.as_ref() == Some(&key) {
            self.open_view = None;
        }
    }

    pub fn reveal(&mut self, chat_id: &str, tool_id: &str) {
        self.open_view = Some((chat_id.to_string(), tool_id.to_string()));
    }

    pub fn close_view(&mut self) {
        self.open_view = None;
    }
}
