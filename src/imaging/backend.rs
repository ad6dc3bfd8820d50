//! The card-drawing boundary and its error type.
//!
//! The [`ImageBackend`] trait defines the three operations the stages need:
//! identify, compose (illustration → blank card), and render (layout → card).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, with
//! `image` for codecs and resampling and `imageproc` + `ab_glyph` for text.

use super::params::{ComposeParams, RenderParams};
use crate::error::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Cannot decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("No usable font found; set [fonts] regular in kielo.toml (tried {0})")]
    FontNotFound(String),
    #[error("Invalid font file {}", .0.display())]
    FontInvalid(PathBuf),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Decode(_) => ErrorKind::InvalidResponseShape,
            _ => ErrorKind::FileIoFailure,
        }
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Stages only ever talk to this trait, so the rest of the codebase is
/// backend-agnostic and tests can record operations instead of drawing.
pub trait ImageBackend {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode a generated illustration and place it on a blank card.
    fn compose(&self, params: &ComposeParams) -> Result<(), BackendError>;

    /// Draw a computed layout onto an illustrated card.
    fn render(&self, params: &RenderParams<'_>) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::layout::{CardLayout, Rect};
    use std::sync::Mutex;

    /// Mock backend that records operations without drawing.
    ///
    /// `compose` and `render` still create an empty output file so later
    /// stages and cache checks see the artifact. `fail_decode_for` makes
    /// `compose` reject specific payloads the way a corrupt image would.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub fail_decode_for: Vec<Vec<u8>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Compose {
            output: String,
            canvas: (u32, u32),
            slot: Rect,
        },
        Render {
            source: String,
            output: String,
            scale: f32,
            lines: usize,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_decode(payload: &[u8]) -> Self {
            Self {
                fail_decode_for: vec![payload.to_vec()],
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn rendered_outputs(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Render { output, .. } => Some(output),
                    _ => None,
                })
                .collect()
        }
    }

    fn touch(path: &Path) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"")?;
        Ok(())
    }

    fn line_count(layout: &CardLayout) -> usize {
        layout.blocks.iter().map(|b| b.lines.len()).sum()
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn compose(&self, params: &ComposeParams) -> Result<(), BackendError> {
            if self.fail_decode_for.contains(&params.image) {
                return Err(BackendError::Decode("mock: unreadable payload".to_string()));
            }
            self.operations.lock().unwrap().push(RecordedOp::Compose {
                output: params.output.to_string_lossy().to_string(),
                canvas: (params.canvas_width, params.canvas_height),
                slot: params.slot,
            });
            touch(&params.output)
        }

        fn render(&self, params: &RenderParams<'_>) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Render {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                scale: params.layout.scale,
                lines: line_count(params.layout),
            });
            touch(&params.output)
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 720,
            height: 1440,
        }]);

        let result = backend.identify(Path::new("/cards/word_lumi.png")).unwrap();
        assert_eq!(result.width, 720);
        assert_eq!(result.height, 1440);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/cards/word_lumi.png"));
    }

    #[test]
    fn mock_compose_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("illustrations/word_lumi.png");
        let backend = MockBackend::new();
        let slot = Rect {
            x: 40,
            y: 400,
            width: 640,
            height: 640,
        };

        backend
            .compose(&ComposeParams {
                image: b"png".to_vec(),
                output: output.clone(),
                canvas_width: 720,
                canvas_height: 1440,
                slot,
            })
            .unwrap();

        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Compose { canvas: (720, 1440), slot: s, .. } if *s == slot
        ));
    }

    #[test]
    fn mock_compose_can_reject_payload() {
        let backend = MockBackend::failing_decode(b"garbage");
        let err = backend
            .compose(&ComposeParams {
                image: b"garbage".to_vec(),
                output: PathBuf::from("/unused.png"),
                canvas_width: 720,
                canvas_height: 1440,
                slot: Rect {
                    x: 0,
                    y: 0,
                    width: 1,
                    height: 1,
                },
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponseShape);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn backend_error_kinds() {
        assert_eq!(
            BackendError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::FileIoFailure
        );
        assert_eq!(
            BackendError::FontNotFound("DejaVuSans.ttf".into()).kind(),
            ErrorKind::FileIoFailure
        );
    }
}
