use std::collections::HashMap;

use serde_json::Value;

use crate::{dom::ElementId, event::ScopeId};

/// Key under which renderers cache the root element.
pub const ROOT: &str = "root";
/// Key under which renderers cache the cover element.
pub const COVER: &str = "cover";
/// Key under which renderers cache their listener scope.
pub const EVENTS: &str = "events";

/// A value computed by a renderer and cached on a component.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    /// A document element.
    Element(ElementId),
    /// A listener scope. Disposable: releasing the cache releases the scope.
    Scope(ScopeId),
    /// A computed string.
    Text(String),
    /// Anything else.
    Value(Value),
}

impl Cached {
    /// Does this entry hold a resource that must be released?
    pub fn is_disposable(&self) -> bool {
        matches!(self, Self::Scope(_))
    }
}

/// Per-component cache owned by the component's active renderer.
#[derive(Debug, Default, Clone)]
pub struct RendererCache {
    /// Cached entries.
    entries: HashMap<String, Cached>,
}

impl RendererCache {
    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&Cached> {
        self.entries.get(key)
    }

    /// Look up an element entry.
    pub fn element(&self, key: &str) -> Option<ElementId> {
        match self.entries.get(key) {
            Some(Cached::Element(el)) => Some(*el),
            _ => None,
        }
    }

    /// Look up a scope entry.
    pub fn scope(&self, key: &str) -> Option<ScopeId> {
        match self.entries.get(key) {
            Some(Cached::Scope(s)) => Some(*s),
            _ => None,
        }
    }

    /// Store an entry, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: Cached) -> Option<Cached> {
        self.entries.insert(key.into(), value)
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) -> Option<Cached> {
        self.entries.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empty the cache, returning the disposable entries so the caller can
    /// release them.
    pub fn drain_disposable(&mut self) -> Vec<Cached> {
        self.entries
            .drain()
            .map(|(_, v)| v)
            .filter(Cached::is_disposable)
            .collect()
    }
}
