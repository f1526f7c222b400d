//! # HyperLicked Test Suite
//!
//! Cross-crate integration flows: trading through the full execution
//! pipeline, consensus over the in-process network simulator, and
//! whole-cluster end-to-end runs.

#[cfg(test)]
mod integration;
