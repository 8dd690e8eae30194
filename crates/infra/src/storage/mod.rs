//! Secret storage backends for the token store

pub mod file;

pub use file::FileSecretStore;
