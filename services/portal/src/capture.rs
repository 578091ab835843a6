//! Frame sources for the camera-driven workflows
//!
//! Orchestration code asks a [`FrameSource`] for one still at a time and
//! never touches a concrete camera, so tests can script the frames.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while preparing frames
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to read frame {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame {0} is empty")]
    Empty(PathBuf),
}

/// One captured still, encoded as a data URL
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn new(data_url: impl Into<String>) -> Self {
        Self(data_url.into())
    }

    /// Encode raw JPEG bytes as a data URL
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self(format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({} bytes)", self.0.len())
    }
}

/// Capability to take one still on demand
pub trait FrameSource: Send + Sync {
    /// Capture a frame, or `None` when the source has nothing to offer
    fn capture_frame(&self) -> Option<Frame>;
}

/// Source replaying a fixed list of frames
#[derive(Debug, Default)]
pub struct ScriptedFrameSource {
    frames: Mutex<VecDeque<Frame>>,
}

impl ScriptedFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl FrameSource for ScriptedFrameSource {
    fn capture_frame(&self) -> Option<Frame> {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

/// Source reading JPEG stills from disk, one file per capture
#[derive(Debug)]
pub struct FileFrameSource {
    inner: ScriptedFrameSource,
}

impl FileFrameSource {
    /// Load every file up front so a bad path fails before any request is made
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, FrameError> {
        let mut frames = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            let bytes = fs::read(path).map_err(|source| FrameError::Read {
                path: path.to_path_buf(),
                source,
            })?;

            if bytes.is_empty() {
                warn!("Frame {} is empty", path.display());
                return Err(FrameError::Empty(path.to_path_buf()));
            }

            frames.push(Frame::from_jpeg(&bytes));
        }

        info!("Loaded {} frame(s) from disk", frames.len());
        Ok(Self {
            inner: ScriptedFrameSource::new(frames),
        })
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

impl FrameSource for FileFrameSource {
    fn capture_frame(&self) -> Option<Frame> {
        self.inner.capture_frame()
    }
}
