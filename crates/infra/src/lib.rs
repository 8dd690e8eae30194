//! # MentorHub Infrastructure
//!
//! Concrete adapters for the session lifecycle in `mentorhub-common`.
//!
//! This crate contains:
//! - Configuration loading (environment, `.env`, TOML/JSON files)
//! - A retrying HTTP client
//! - The embedded database adapter for local sign-in and profile lookups
//! - File-backed secret storage and a system-browser navigator
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `mentorhub-common::auth`
//! - Depends on `mentorhub-domain` and `mentorhub-common`
//! - Contains all "impure" code (I/O, network, OS integration)

pub mod bootstrap;
pub mod config;
pub mod http;
pub mod integrations;
pub mod navigator;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use bootstrap::{build_runtime, AuthRuntime, StorageChoice};
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::SupabaseAuth;
pub use navigator::SystemBrowser;
pub use observability::init_tracing;
pub use storage::FileSecretStore;
