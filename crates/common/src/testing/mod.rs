//! Testing utilities
//!
//! In-memory stand-ins for the seams of the session lifecycle:
//! - **[`mocks`]**: scripted identity provider, local auth and profile
//!   source, a recording navigator and a failing secret backend
//!
//! Enable the `test-utils` feature to use these from other crates.

pub mod mocks;

pub use mocks::{
    FailingSecretBackend, MockIdentityProvider, MockLocalAuth, MockProfileSource,
    RecordingNavigator,
};
