//! Integration test crate for ChromaKey.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the core and effects crates to verify they work together.

#[cfg(test)]
mod render;

#[cfg(test)]
mod invariants;
