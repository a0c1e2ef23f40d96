//! Writing-system factory collaborator.
//!
//! Text sources resolve per-run script metadata (direction, default font) through a
//! [`WritingSystemFactory`]. The factory is an opaque lookup service; [`WsRegistry`] is a
//! simple in-memory implementation.

use crate::props::WsId;
use std::collections::HashMap;

/// Script/language metadata for one writing system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritingSystem {
    /// Identifier.
    pub id: WsId,
    /// Language tag (e.g. `en`, `ar-SA`).
    pub locale: String,
    /// Right-to-left script.
    pub right_to_left: bool,
    /// Font used when a run asks for the default font.
    pub default_font: String,
}

impl WritingSystem {
    /// A left-to-right writing system.
    pub fn ltr(id: WsId, locale: impl Into<String>, default_font: impl Into<String>) -> Self {
        Self {
            id,
            locale: locale.into(),
            right_to_left: false,
            default_font: default_font.into(),
        }
    }

    /// A right-to-left writing system.
    pub fn rtl(id: WsId, locale: impl Into<String>, default_font: impl Into<String>) -> Self {
        Self {
            right_to_left: true,
            ..Self::ltr(id, locale, default_font)
        }
    }
}

/// Resolves writing-system ids to metadata.
pub trait WritingSystemFactory {
    /// Look up a writing system. `None` if unknown.
    fn get(&self, ws: WsId) -> Option<&WritingSystem>;
}

/// In-memory [`WritingSystemFactory`].
#[derive(Debug, Clone, Default)]
pub struct WsRegistry {
    systems: HashMap<WsId, WritingSystem>,
}

impl WsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a writing system.
    pub fn insert(&mut self, ws: WritingSystem) {
        self.systems.insert(ws.id, ws);
    }

    /// Builder-style [`WsRegistry::insert`].
    pub fn with(mut self, ws: WritingSystem) -> Self {
        self.insert(ws);
        self
    }

    /// Number of registered writing systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl WritingSystemFactory for WsRegistry {
    fn get(&self, ws: WsId) -> Option<&WritingSystem> {
        self.systems.get(&ws)
    }
}
