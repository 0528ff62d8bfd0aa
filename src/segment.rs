// SPDX-License-Identifier: MIT

//! Boundary token extraction and raw body segmentation.
//!
//! The body is treated as bytes throughout: file payloads are binary and
//! must survive segmentation byte-exact, so the delimiter matcher runs on
//! `regex::bytes` rather than on text.

use crate::error::ParseError;
use regex::bytes::Regex;

/// The only media type this crate decodes.
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// One boundary-delimited slice of the body, split at the first blank line
/// into its header block and payload.
#[derive(Debug, Clone, Copy)]
pub struct PartSegment<'a> {
    /// Raw header block, without the terminating blank line.
    pub headers: &'a [u8],
    /// Raw payload bytes, verbatim.
    pub body: &'a [u8],
}

/// Extracts the boundary token from a `Content-Type` header value.
///
/// The media type must equal `multipart/form-data` exactly (case-sensitive)
/// and the piece right after it must carry `boundary=`. One layer of
/// surrounding `"` is stripped from the token; no further validation of the
/// boundary character set happens here — segmentation escapes the token
/// when it builds the delimiter pattern.
pub fn read_boundary(content_type: &str) -> Result<String, ParseError> {
    let mut pieces = content_type.split(';').map(str::trim);

    let media_type = pieces.next().unwrap_or_default();
    if media_type != CONTENT_TYPE_MULTIPART {
        return Err(ParseError::unsupported_content_type(media_type));
    }

    let token = pieces
        .next()
        .and_then(|piece| piece.strip_prefix("boundary="))
        .ok_or(ParseError::MissingBoundary)?;

    let token = token.strip_prefix('"').unwrap_or(token);
    let token = token.strip_suffix('"').unwrap_or(token);
    Ok(token.to_string())
}

/// Splits the raw body on every `--<boundary>` delimiter, absorbing the
/// optional `\r\n` on either side so inter-part and terminal delimiters
/// segment uniformly.
///
/// The slice before the first boundary (preamble) and the slice after the
/// terminal `--boundary--` (epilogue) are discarded unconditionally. The
/// remaining segments keep body order, which governs array-index
/// assignment downstream.
pub fn split_segments<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>, ParseError> {
    let pattern = format!(r"(\r\n)?--{}\s*?(\r\n)?", regex::escape(boundary));
    let delimiter = Regex::new(&pattern)
        .map_err(|_| ParseError::InvalidBoundaryPattern(boundary.to_string()))?;

    let mut segments: Vec<&[u8]> = delimiter.split(body).collect();
    if !segments.is_empty() {
        segments.remove(0);
    }
    segments.pop();
    Ok(segments)
}

/// Splits one segment at the first `\r\n\r\n` into header block and payload.
///
/// Returns `None` when the blank line is absent. The RFC permits headerless
/// parts, but without a header block there is no disposition to route on,
/// so callers skip such segments.
pub fn split_part(segment: &[u8]) -> Option<PartSegment<'_>> {
    let blank = find_subslice(segment, b"\r\n\r\n")?;
    Some(PartSegment {
        headers: &segment[..blank],
        body: &segment[blank + 4..],
    })
}

/// Binary pattern search - find needle in haystack.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    (0..=(haystack.len() - needle.len())).find(|&i| haystack[i..i + needle.len()] == *needle)
}
