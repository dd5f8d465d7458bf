//! The error type surfaced by the parser.

use thiserror::Error;

/// The single error the parser raises.
///
/// Partial input is never an error: [`Parser::consume`](crate::Parser::consume)
/// returns `Ok` at any chunk boundary, including mid-token. `Malformed` is
/// raised only once a byte is observed that cannot begin a legal completion
/// of the document, and it is fatal to the parser instance: every later
/// `consume` call repeats the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed JSON: {reason}")]
pub struct Malformed {
    reason: Box<str>,
}

impl Malformed {
    pub(crate) fn new(reason: impl Into<Box<str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Like [`Malformed::new`], tagging the absolute byte offset of the
    /// offending input.
    pub(crate) fn at(offset: usize, reason: impl AsRef<str>) -> Self {
        Self::new(format!("{} at byte {offset}", reason.as_ref()))
    }

    /// Human-readable description of what went wrong.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_reason() {
        let err = Malformed::at(12, "unexpected ':'");
        assert_eq!(err.to_string(), "malformed JSON: unexpected ':' at byte 12");
        assert_eq!(err.reason(), "unexpected ':' at byte 12");
    }
}
