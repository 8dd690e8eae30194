//! Authorization and secret storage
//!
//! - **[`rbac`]**: static role → permission and route tables
//! - **[`keychain`]**: platform keychain backend for token storage
//!   (`platform` feature)

#[cfg(feature = "platform")]
pub mod keychain;
pub mod rbac;

#[cfg(feature = "platform")]
pub use keychain::{KeychainError, KeychainProvider};
pub use rbac::{PermissionEvaluator, PermissionTable, RouteTable, ROLE_PERMISSIONS, ROUTE_ACCESS};
