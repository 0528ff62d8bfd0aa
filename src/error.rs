// SPDX-License-Identifier: MIT

use std::fmt;

/// Failures raised while decoding a multipart/form-data body.
///
/// Every kind is a deterministic function of the input; nothing here is
/// retriable. Per-part anomalies the RFC tolerates (a part without a
/// header/body separator, without a disposition, without a field name) are
/// not errors at all — those parts are skipped and parsing continues.
#[derive(Debug)]
pub enum ParseError {
    /// The Content-Type header's media type isn't `multipart/form-data`.
    UnsupportedContentType(String),
    /// No `boundary=` parameter followed the media type.
    MissingBoundary,
    /// The boundary token could not be turned into a delimiter matcher.
    InvalidBoundaryPattern(String),
    /// A part's header line has no `:` separator.
    MalformedHeader(String),
    /// A part's header name carries leading or trailing whitespace.
    MalformedHeaderName(String),
    /// The external upload factory refused to build a file handle.
    FileFactory(Box<dyn std::error::Error + Send + Sync>),
    /// A file-tree leaf referenced a placeholder id with no registered
    /// handle. Internal consistency failure; surfaced rather than ignored.
    DanglingPlaceholder(u64),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnsupportedContentType(media_type) => {
                write!(f, "Unsupported content type '{media_type}': expected multipart/form-data")
            }
            ParseError::MissingBoundary => {
                write!(f, "Content-Type header has no boundary parameter")
            }
            ParseError::InvalidBoundaryPattern(boundary) => {
                write!(f, "Cannot build a delimiter matcher from boundary '{boundary}'")
            }
            ParseError::MalformedHeader(line) => {
                write!(f, "Malformed part header line: {line}")
            }
            ParseError::MalformedHeaderName(line) => {
                write!(f, "Whitespace around part header name: {line}")
            }
            ParseError::FileFactory(err) => write!(f, "Upload factory error: {err}"),
            ParseError::DanglingPlaceholder(id) => {
                write!(f, "No upload handle registered for placeholder id {id}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::FileFactory(err) => {
                let err: &(dyn std::error::Error + 'static) = err.as_ref();
                Some(err)
            }
            _ => None,
        }
    }
}

impl ParseError {
    /// Creates an UnsupportedContentType error carrying the rejected type.
    pub fn unsupported_content_type<S: Into<String>>(media_type: S) -> Self {
        ParseError::UnsupportedContentType(media_type.into())
    }

    /// Creates a MalformedHeader error carrying the offending line.
    pub fn malformed_header<S: Into<String>>(line: S) -> Self {
        ParseError::MalformedHeader(line.into())
    }

    /// Creates a MalformedHeaderName error carrying the offending line.
    pub fn malformed_header_name<S: Into<String>>(line: S) -> Self {
        ParseError::MalformedHeaderName(line.into())
    }

    /// Wraps a failure from the external upload factory.
    pub fn file_factory<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ParseError::FileFactory(Box::new(err))
    }

    /// Checks whether the error describes faulty input, as opposed to a
    /// failing collaborator (`FileFactory`) or a broken internal invariant
    /// (`DanglingPlaceholder`).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ParseError::UnsupportedContentType(_)
                | ParseError::MissingBoundary
                | ParseError::InvalidBoundaryPattern(_)
                | ParseError::MalformedHeader(_)
                | ParseError::MalformedHeaderName(_)
        )
    }
}
