//! Scoped status messages shown next to the control that triggered them

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVariant {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub variant: StatusVariant,
    pub message: String,
}

impl StatusMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            variant: StatusVariant::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            variant: StatusVariant::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            variant: StatusVariant::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == StatusVariant::Error
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StatusMessage {
    /// Scoped message for a failed operation
    ///
    /// Unauthorized failures are handled globally by the forced logout and get
    /// no local message.
    pub fn from_error(err: &common::ClientError) -> Option<Self> {
        match err {
            common::ClientError::Unauthorized => None,
            other => Some(Self::error(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ClientError;

    #[test]
    fn test_unauthorized_has_no_local_message() {
        assert_eq!(StatusMessage::from_error(&ClientError::Unauthorized), None);
    }

    #[test]
    fn test_remote_failure_becomes_error_message() {
        let message = StatusMessage::from_error(&ClientError::Remote {
            status: 400,
            message: "You already have a pending face update request.".to_string(),
        })
        .unwrap();
        assert!(message.is_error());
        assert_eq!(
            message.to_string(),
            "You already have a pending face update request."
        );
    }
}
