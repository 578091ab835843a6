//! Route guard for the role-scoped workspaces

use common::{Credential, CredentialStore, Role};

pub const LOGIN_PATH: &str = "/login";

/// Role-scoped area of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workspace {
    Admin,
    Teacher,
    Student,
}

impl Workspace {
    /// Landing workspace for a signed-in role
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Workspace::Admin,
            Role::Teacher => Workspace::Teacher,
            Role::Student => Workspace::Student,
        }
    }

    /// Role required to enter the workspace
    pub fn role(&self) -> Role {
        match self {
            Workspace::Admin => Role::Admin,
            Workspace::Teacher => Role::Teacher,
            Workspace::Student => Role::Student,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Workspace::Admin => "/admin",
            Workspace::Teacher => "/teacher",
            Workspace::Student => "/student",
        }
    }
}

/// Outcome of a guarded navigation
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Granted(Credential),
    Redirect(&'static str),
}

/// Decide whether the current credential may enter `workspace`
pub fn authorize(store: &dyn CredentialStore, workspace: Workspace) -> Access {
    match store.current() {
        Some(credential) if credential.role == workspace.role() => Access::Granted(credential),
        _ => Access::Redirect(LOGIN_PATH),
    }
}
