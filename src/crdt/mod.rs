//! Sequence-CRDT reconstruction shared by the scene tree and text model.

pub mod sequence;

pub use sequence::{toposort, CrdtSequence, CrdtSequenceItem};
