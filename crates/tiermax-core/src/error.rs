//! # Domain Errors
//!
//! ```text
//! CoreError        policy names and serialized rule keys that don't parse
//! ValidationError  plan catalog records unfit for storage (used by tiermax-db)
//!
//! not errors       FallbackReason: resolution always degrades to the default
//! ```
//!
//! Resolving a maximum never fails. Missing memberships, malformed plans and
//! unset rules are defined behavior (the default maximum passes through), so
//! they live in [`crate::resolver::FallbackReason`] instead of here.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tie-break policy name is not recognized.
    ///
    /// ## When This Occurs
    /// - `TIERMAX_TIE_BREAK` holds a typo
    /// - Config file names a policy from a newer version
    #[error("Unknown tie-break policy: '{0}'. Valid options: last_listed, highest_priority")]
    UnknownTieBreak(String),

    /// A serialized rule key lacks the rule prefix or a tier part.
    #[error("Not a tier maximum rule key: '{0}'")]
    InvalidRuleKey(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised when catalog data handed to the persistence layer doesn't meet
/// requirements. The rule editor's save path never produces these.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Blank slug or name.
    #[error("{field} is required")]
    Required { field: String },

    /// Longer than the catalog column allows.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., uppercase letters in a slug).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================
