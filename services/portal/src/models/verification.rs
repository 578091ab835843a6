//! Face verification payloads

use serde::{Deserialize, Serialize};

use common::{ClientError, ClientResult};

/// Request for verifying one captured frame
#[derive(Debug, Clone, Serialize)]
pub struct VerifyFaceRequest {
    pub image_data: String,
}

/// Raw verification response
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationResponse {
    pub matched: bool,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub probe_embedding: Option<String>,
    #[serde(default)]
    pub matched_embedding: Option<String>,
}

/// Decoded verification verdict
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Matched {
        student_id: String,
        student_name: String,
        confidence: f64,
    },
    Unmatched {
        confidence: Option<f64>,
        message: String,
    },
}

/// Debug-only embeddings for the probe frame and the matched reference
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugEmbeddings {
    pub probe: Option<String>,
    pub matched: Option<String>,
}

impl VerificationResponse {
    /// Split the response into its verdict and debug payloads
    ///
    /// A positive match must name the student; anything else is a decode error.
    pub fn decode(self) -> ClientResult<(Verification, DebugEmbeddings)> {
        let embeddings = DebugEmbeddings {
            probe: self.probe_embedding,
            matched: self.matched_embedding,
        };

        let verdict = if self.matched {
            let student_id = self.student_id.ok_or_else(|| {
                ClientError::Decode("matched verification without student_id".to_string())
            })?;
            let student_name = self.student_name.unwrap_or_else(|| student_id.clone());
            Verification::Matched {
                student_id,
                student_name,
                confidence: self.confidence.unwrap_or(0.0),
            }
        } else {
            Verification::Unmatched {
                confidence: self.confidence,
                message: self
                    .message
                    .unwrap_or_else(|| "Face not recognized.".to_string()),
            }
        };

        Ok((verdict, embeddings))
    }
}

impl Verification {
    /// Feedback line shown next to the capture control
    pub fn feedback(&self) -> String {
        match self {
            Verification::Matched {
                student_id,
                student_name,
                confidence,
            } => format!("Marked {student_name} ({student_id}) • confidence {confidence:.2}"),
            Verification::Unmatched {
                confidence: Some(confidence),
                message,
            } => format!("{message} • confidence {confidence:.2}"),
            Verification::Unmatched {
                confidence: None,
                message,
            } => message.clone(),
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Verification::Matched { .. })
    }
}
