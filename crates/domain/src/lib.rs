//! # MentorHub Domain
//!
//! Business domain types for the MentorHub delegated-authentication core.
//!
//! This crate contains:
//! - Roles, sessions, user claims and the realized `AuthUser`
//! - Domain error types and Result definitions
//! - Configuration structures for the parent identity provider
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other MentorHub crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
