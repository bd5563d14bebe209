//! Core types for the Arbor component tree.

/// Renderer cache storage.
pub mod cache;
/// Document capability.
pub mod dom;
/// Core error types.
pub mod error;
/// Event types and listener registry.
pub mod event;
/// Node ID types.
pub mod id;
/// Reentrant update lock.
pub mod lock;
/// Component node data.
pub mod node;
/// Construction options.
pub mod options;
/// Renderer trait, class table and registry.
pub mod renderer;
/// Component state flags.
pub mod state;
/// Component arena and lifecycle operations.
pub mod world;

pub use id::NodeId;
pub use node::Kind;
pub use options::Options;
pub use world::Core;
