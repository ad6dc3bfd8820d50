//! Error taxonomy shared by every pipeline stage.
//!
//! Each module owns its own `thiserror` enum; this module only classifies
//! those errors so the stages can decide, uniformly, whether a failure skips
//! one entry or aborts the whole stage.
//!
//! | Kind | Typical cause | Handling |
//! |---|---|---|
//! | [`ErrorKind::CollaboratorUnavailable`] | network, auth, missing API key | fallback, else abort stage |
//! | [`ErrorKind::InvalidResponseShape`] | malformed JSON, blocked or undecodable image | skip entry |
//! | [`ErrorKind::LayoutFailure`] | text cannot fit around the illustration | skip entry |
//! | [`ErrorKind::MissingMappingEntry`] | word absent from `mapping.json` | skip entry |
//! | [`ErrorKind::FileIoFailure`] | reading or writing an artifact | abort stage |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CollaboratorUnavailable,
    InvalidResponseShape,
    LayoutFailure,
    MissingMappingEntry,
    FileIoFailure,
}

impl ErrorKind {
    /// Recoverable errors skip the offending entry; the stage carries on.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidResponseShape
                | ErrorKind::LayoutFailure
                | ErrorKind::MissingMappingEntry
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::CollaboratorUnavailable => "collaborator unavailable",
            ErrorKind::InvalidResponseShape => "invalid response shape",
            ErrorKind::LayoutFailure => "layout failure",
            ErrorKind::MissingMappingEntry => "missing mapping entry",
            ErrorKind::FileIoFailure => "file I/O failure",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_skip_entries() {
        assert!(ErrorKind::InvalidResponseShape.is_recoverable());
        assert!(ErrorKind::LayoutFailure.is_recoverable());
        assert!(ErrorKind::MissingMappingEntry.is_recoverable());
    }

    #[test]
    fn fatal_kinds_abort_the_stage() {
        assert!(!ErrorKind::CollaboratorUnavailable.is_recoverable());
        assert!(!ErrorKind::FileIoFailure.is_recoverable());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            ErrorKind::MissingMappingEntry.to_string(),
            "missing mapping entry"
        );
    }
}
