//! Error types for forcecmd-xml.

/// Result type alias for XML parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Malformed input. The parser never recovers, so this is always fatal for
/// the document being read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("XML parse error at byte {position}: {note} (near {context:?})")]
pub struct ParseError {
    /// Byte offset of the cursor when the error was detected.
    pub position: usize,
    /// Up to 30 characters of input starting at `position`.
    pub context: String,
    /// What the parser expected.
    pub note: String,
}

impl ParseError {
    pub(crate) fn at(xml: &str, position: usize, note: impl Into<String>) -> Self {
        let context = xml
            .get(position..)
            .map(|rest| rest.chars().take(30).collect())
            .unwrap_or_default();
        Self {
            position,
            context,
            note: note.into(),
        }
    }
}
