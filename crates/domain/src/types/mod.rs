//! Domain types for the authentication core
//!
//! - [`role`]: the fixed role enumeration
//! - [`session`]: persisted session and OAuth transaction state
//! - [`user`]: identity claims, profile records and the realized `AuthUser`

pub mod role;
pub mod session;
pub mod user;

pub use role::Role;
pub use session::{OAuthTransaction, Session, SessionOrigin};
pub use user::{AuthUser, UserClaims, UserProfile};
