//! Components built on the core arena.

pub mod list;
