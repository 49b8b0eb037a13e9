// subforge-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Test doubles for the container tools, so the orchestrator can be exercised
// without mkvtoolnix installed. They write real files, since the extraction
// driver checks artifacts on disk.

use super::{MetadataProbe, ToolOutput, TrackExtractor};
use crate::error::{CoreError, CoreResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Contents written for tracks without an explicit behaviour.
pub const MOCK_SRT: &[u8] = b"1\n00:00:01,000 --> 00:00:02,000\nmock subtitle\n";

/// What the mock extractor does for one track.
#[derive(Debug, Clone)]
pub enum MockExtraction {
    /// Write these bytes and report success.
    Write(Vec<u8>),
    /// Write these bytes, print `stderr` and report success.
    WriteWithStderr { contents: Vec<u8>, stderr: String },
    /// Report success without writing anything.
    NoFile,
    /// Report an extractor failure with the given output.
    Fail { status: String, output: String },
}

/// Mock implementation of TrackExtractor.
#[derive(Clone, Default)]
pub struct MockTrackExtractor {
    behaviours: Rc<RefCell<HashMap<u64, MockExtraction>>>,
    received_calls: Rc<RefCell<Vec<(u64, PathBuf)>>>,
}

impl MockTrackExtractor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the behaviour for `track_id`.
    pub fn on_track(&self, track_id: u64, behaviour: MockExtraction) {
        self.behaviours.borrow_mut().insert(track_id, behaviour);
    }

    /// Calls received so far, in order: `(track_id, destination)`.
    pub fn calls(&self) -> Vec<(u64, PathBuf)> {
        self.received_calls.borrow().clone()
    }
}

impl TrackExtractor for MockTrackExtractor {
    fn extract_track(&self, _container: &Path, track_id: u64, dest: &Path) -> CoreResult<ToolOutput> {
        self.received_calls
            .borrow_mut()
            .push((track_id, dest.to_path_buf()));
        log::debug!("MockTrackExtractor: track {} -> {}", track_id, dest.display());

        let behaviour = self
            .behaviours
            .borrow()
            .get(&track_id)
            .cloned()
            .unwrap_or_else(|| MockExtraction::Write(MOCK_SRT.to_vec()));

        match behaviour {
            MockExtraction::Write(bytes) => {
                std::fs::write(dest, bytes)?;
                // VobSub extraction produces the .sub sibling too.
                if dest.extension().is_some_and(|ext| ext == "idx") {
                    std::fs::write(dest.with_extension("sub"), b"\x00\x00\x01\xba")?;
                }
                Ok(ToolOutput {
                    status: "exit status: 0".into(),
                    ..ToolOutput::default()
                })
            }
            MockExtraction::WriteWithStderr { contents, stderr } => {
                std::fs::write(dest, contents)?;
                Ok(ToolOutput {
                    status: "exit status: 0".into(),
                    stderr,
                    ..ToolOutput::default()
                })
            }
            MockExtraction::NoFile => Ok(ToolOutput {
                status: "exit status: 0".into(),
                ..ToolOutput::default()
            }),
            MockExtraction::Fail { status, output } => Err(CoreError::ExtractionFailed {
                track_id,
                status,
                output,
            }),
        }
    }
}

/// Mock implementation of MetadataProbe returning canned output.
#[derive(Clone)]
pub struct MockMetadataProbe {
    response: Rc<RefCell<CoreResult<Vec<u8>>>>,
    received_calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl MockMetadataProbe {
    /// Probe that answers with `json`.
    pub fn with_json(json: &str) -> Self {
        Self {
            response: Rc::new(RefCell::new(Ok(json.as_bytes().to_vec()))),
            received_calls: Rc::default(),
        }
    }

    /// Probe that fails like a missing tool.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Rc::new(RefCell::new(Err(CoreError::ToolInvocation {
                tool: "mkvmerge".into(),
                message: message.into(),
            }))),
            received_calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.received_calls.borrow().clone()
    }
}

impl MetadataProbe for MockMetadataProbe {
    fn identify(&self, container: &Path) -> CoreResult<Vec<u8>> {
        self.received_calls.borrow_mut().push(container.to_path_buf());
        match &*self.response.borrow() {
            Ok(bytes) => Ok(bytes.clone()),
            Err(CoreError::ToolInvocation { tool, message }) => Err(CoreError::ToolInvocation {
                tool: tool.clone(),
                message: message.clone(),
            }),
            Err(other) => Err(CoreError::OperationFailed(other.to_string())),
        }
    }
}
