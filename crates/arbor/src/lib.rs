//! Arbor: a component tree with pluggable renderers and ordered collections.
//!
//! Arbor keeps widgets in an arena, projects their state onto a document
//! through shared, stateless renderers, and provides a `List` collection that
//! keeps a logical ordering over its children and reconciles the document
//! once per batch of structural changes.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`Core`] - The component arena, event dispatch and lifecycle operations
//! - [`ListMut`] - Structural operations on a list, obtained from [`Core::list`]
//! - [`Renderer`] - The trait implemented by all renderers
//!
//! # Module Organization
//!
//! - [`dom`] - The document capability and an in-memory implementation
//! - [`widgets`] - Collection widgets built on the core

#![warn(missing_docs)]

// Internal core module - re-export specific items below
mod core;

// Public modules
pub mod logging;
pub mod widgets;

pub use core::{
    Core, Kind, NodeId, Options,
    cache::{self, Cached, RendererCache},
    dom,
    error::{self, Error, Result},
    event::{self, Event, EventType, ListenerId, Outcome, ScopeId},
    lock::{self, UpdateLock},
    node::{self, Node},
    options,
    renderer::{self, BasicRenderer, ClassTable, RenderCx, Renderer, RendererRegistry, Transition},
    state::{self, State, StateMask},
    world,
};
pub use widgets::list::{BATCH_SIZE, Collection, ListMut, Target};
