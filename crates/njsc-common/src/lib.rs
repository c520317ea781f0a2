//! Common types and utilities for the njsc compiler.
//!
//! This crate provides foundational types used across all njsc crates:
//! - String interning (`Atom`, `Interner`)
//! - Source locations (`SourceLocation`)
//! - Centralized limits and thresholds

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Source location tracking (line numbers)
pub mod position;
pub use position::SourceLocation;

// Centralized limits and thresholds
pub mod limits;
