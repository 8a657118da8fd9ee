//! Element tree for the Trellis style engine.
//!
//! Nodes live in a flat arena owned by [`Document`]. Children are owned
//! by index lists flowing parent to child; the parent link is a plain
//! [`NodeId`] used for lookups only, so the tree has no reference cycles.

pub mod builder;
pub mod node;

pub use builder::DocumentBuilder;
pub use node::{Document, ElementNode, Node, NodeId, NodeKind};
