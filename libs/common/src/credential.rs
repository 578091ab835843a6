//! Credential model and stores
//!
//! A credential is created by a successful login and destroyed by an explicit
//! logout or by any unauthorized response. Every outbound request reads the
//! store; `set_credential` and `logout` are its only mutation paths.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{ClientError, ClientResult};

/// Workspace role carried by a credential
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Get the role name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }

    /// Parse a role name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "TEACHER" => Some(Role::Teacher),
            "STUDENT" => Some(Role::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer credential held for the signed-in user
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub token: String,
    pub role: Role,
    pub display_name: String,
    pub must_change_password: bool,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .field("display_name", &self.display_name)
            .field("must_change_password", &self.must_change_password)
            .finish()
    }
}

/// Process-wide credential state shared by the gateway and route guards
pub trait CredentialStore: Send + Sync {
    /// Snapshot of the current credential, if any
    fn current(&self) -> Option<Credential>;

    /// Replace all credential fields at once
    fn set_credential(&self, credential: Credential);

    /// Clear all credential fields at once
    ///
    /// Returns `true` only for the call that actually removed a credential,
    /// so callers can run logout side effects exactly once.
    fn logout(&self) -> bool;

    /// Drop the forced password change flag in place
    ///
    /// Does nothing once the credential has been cleared. Returns `true` when
    /// a credential was updated.
    fn clear_forced_password_change(&self) -> bool;

    /// Bearer token of the current credential
    fn token(&self) -> Option<String> {
        self.current().map(|credential| credential.token)
    }

    /// Role of the current credential
    fn role(&self) -> Option<Role> {
        self.current().map(|credential| credential.role)
    }
}

fn read_slot(slot: &RwLock<Option<Credential>>) -> RwLockReadGuard<'_, Option<Credential>> {
    slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_slot(slot: &RwLock<Option<Credential>>) -> RwLockWriteGuard<'_, Option<Credential>> {
    slot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that starts signed in
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn current(&self) -> Option<Credential> {
        read_slot(&self.slot).clone()
    }

    fn set_credential(&self, credential: Credential) {
        *write_slot(&self.slot) = Some(credential);
    }

    fn logout(&self) -> bool {
        write_slot(&self.slot).take().is_some()
    }

    fn clear_forced_password_change(&self) -> bool {
        match write_slot(&self.slot).as_mut() {
            Some(credential) => {
                credential.must_change_password = false;
                true
            }
            None => false,
        }
    }
}

/// Store persisted as JSON so a restart restores the signed-in user
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    slot: RwLock<Option<Credential>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, restoring any credential already saved there
    ///
    /// A missing file means signed out. An unreadable or malformed file is
    /// discarded with a warning rather than failing startup.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let restored = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Credential>(&contents) {
                Ok(credential) => {
                    info!(
                        "Restored {} credential for {}",
                        credential.role, credential.display_name
                    );
                    Some(credential)
                }
                Err(e) => {
                    warn!("Discarding malformed credential file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ClientError::Persistence(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            path,
            slot: RwLock::new(restored),
        })
    }

    /// Location of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credential: &Credential) {
        let result = serde_json::to_string(credential)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.path, json).map_err(|e| e.to_string()));

        if let Err(e) = result {
            error!("Failed to persist credential to {}: {}", self.path.display(), e);
        }
    }

    fn erase(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn current(&self) -> Option<Credential> {
        read_slot(&self.slot).clone()
    }

    fn set_credential(&self, credential: Credential) {
        let mut slot = write_slot(&self.slot);
        self.persist(&credential);
        *slot = Some(credential);
    }

    fn logout(&self) -> bool {
        let mut slot = write_slot(&self.slot);
        let cleared = slot.take().is_some();
        if cleared {
            self.erase();
        }
        cleared
    }

    fn clear_forced_password_change(&self) -> bool {
        let mut slot = write_slot(&self.slot);
        match slot.as_mut() {
            Some(credential) => {
                credential.must_change_password = false;
                self.persist(credential);
                true
            }
            None => false,
        }
    }
}
