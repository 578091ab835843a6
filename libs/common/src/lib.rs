//! Common library for the attendance client
//!
//! This crate provides the pieces shared by every client component:
//! configuration, the error taxonomy, and the credential store.

pub mod config;
pub mod credential;
pub mod error;

pub use config::ClientConfig;
pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, Role};
pub use error::{ClientError, ClientResult};
