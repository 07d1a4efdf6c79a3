//! The variant rule engine: board primitives, the explosion-capture move
//! semantics and check detection.

pub mod board;
pub mod core;
pub mod rules;
