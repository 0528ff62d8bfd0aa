//! Raw part-header line parsing (RFC 2045/2046 style `Name: value; k="v"`).

use crate::error::ParseError;
use std::collections::HashMap;

/// One parsed header line from a multipart part's header block.
///
/// The header name keeps the case it was written with but is meant to be
/// compared case-insensitively by callers. The value before the first `;`
/// is the primary value; every `key=value` piece after a `;` lands in the
/// parameter map under its lowercased key.
#[derive(Debug, Clone)]
pub struct HeaderLine {
    name: String,
    value: String,
    params: HashMap<String, String>,
}

impl HeaderLine {
    /// Parses a single raw header line without its trailing line terminator.
    ///
    /// Fails with [`ParseError::MalformedHeader`] when the line has no `:`
    /// and with [`ParseError::MalformedHeaderName`] when the name piece
    /// carries leading or trailing whitespace, which the RFC forbids.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let (name, rest) = raw
            .split_once(':')
            .ok_or_else(|| ParseError::malformed_header(raw))?;

        if name.trim() != name {
            return Err(ParseError::malformed_header_name(raw));
        }

        let value = rest.split(';').next().unwrap_or_default().trim().to_string();

        // Every piece is scanned, the primary value included: a stray
        // `key=value` before the first `;` still registers as a parameter.
        // Pieces without `=` are bare attributes and are ignored.
        let mut params = HashMap::new();
        for piece in rest.split(';').map(str::trim) {
            if let Some((key, key_value)) = piece.split_once('=') {
                let key = key.trim().to_lowercase();
                let key_value = strip_quotes(key_value.trim()).to_string();
                params.insert(key, key_value);
            }
        }

        Ok(Self {
            name: name.to_string(),
            value,
            params,
        })
    }

    /// The header name, case-preserved as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary value: the trimmed text before the first `;`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Looks up a parameter by its lowercase name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Strips one layer of `"` or `'` quoting from each end independently, so
/// asymmetric quoting like `"John` or `John'` is tolerated.
pub(crate) fn strip_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}
