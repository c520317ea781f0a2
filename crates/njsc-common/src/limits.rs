//! Centralized limits and thresholds.

/// Maximum nesting depth rendered when formatting a type for diagnostics.
/// Deeper structure is elided with `...`; recursive shapes print
/// `<<recursive>>` at the point of re-entry.
pub const TYPE_DISPLAY_DEPTH_LIMIT: usize = 16;

/// Red zone for stack growth checks in deeply recursive type walks.
pub const STACK_RED_ZONE: usize = 100 * 1024;

/// Fresh stack segment size allocated when the red zone is hit.
pub const STACK_GROWTH: usize = 1024 * 1024;
