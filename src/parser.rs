//! Part classification and the parse orchestrator.
//!
//! Segments flow through here in body order: each one is split into header
//! block and payload, its headers parsed, its disposition checked, and the
//! part routed to the field list or — through the external upload factory —
//! to the file list. The two flat lists are then rebuilt into nested trees
//! and file placeholders substituted with their handles.

use crate::error::ParseError;
use crate::header::HeaderLine;
use crate::registry::UploadRegistry;
use crate::segment::{read_boundary, split_part, split_segments};
use crate::tree::{Node, build_tree};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Content type assumed for file parts that do not declare one.
const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain";

/// External capability that turns a file part into an upload handle.
///
/// The parser never constructs concrete file objects itself; it hands the
/// payload bytes and the declared filename and content type to the factory
/// and stores whatever opaque handle comes back. A factory failure aborts
/// the parse as [`ParseError::FileFactory`].
pub trait UploadFactory {
    /// The opaque handle stored at file-tree leaves.
    type Handle;
    /// The factory's own failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_upload(
        &mut self,
        contents: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<Self::Handle, Self::Error>;
}

/// External request abstraction the decoded trees can be written back onto.
pub trait FormRequest<H> {
    fn raw_body(&self) -> &[u8];
    fn content_type_header(&self) -> &str;
    fn set_parsed_fields(&mut self, fields: Node<String>);
    fn set_uploaded_files(&mut self, files: Node<H>);
}

/// The decoded result of one parse: the resolved boundary plus the two
/// trees, fields and files, both rooted at map nodes.
#[derive(Debug)]
pub struct FormData<H> {
    boundary: String,
    fields: Node<String>,
    files: Node<H>,
}

impl<H> FormData<H> {
    /// The boundary token the body was segmented on, for diagnostics.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Root of the form-field tree.
    pub fn fields(&self) -> &Node<String> {
        &self.fields
    }

    /// Root of the uploaded-file tree.
    pub fn files(&self) -> &Node<H> {
        &self.files
    }

    /// Looks up a top-level field entry.
    pub fn field(&self, key: &str) -> Option<&Node<String>> {
        self.fields.get(key)
    }

    /// Looks up a top-level file entry.
    pub fn file(&self, key: &str) -> Option<&Node<H>> {
        self.files.get(key)
    }

    /// Consumes the result, yielding both trees.
    pub fn into_parts(self) -> (Node<String>, Node<H>) {
        (self.fields, self.files)
    }
}

/// Assigns form keys to file parts whose disposition carries no usable
/// `name`. Monotone for the lifetime of the owning [`Parser`], never reset
/// between parses, and atomic so concurrent parses through a shared parser
/// cannot hand out colliding keys.
#[derive(Debug, Default)]
struct AnonymousIndex(AtomicU64);

impl AnonymousIndex {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Decodes multipart/form-data bodies into field and file trees.
///
/// A `Parser` is cheap to construct and reusable; the only state it carries
/// across parses is the anonymous-file index.
///
/// # Example
/// ```
/// use formdrop::{Parser, UploadFactory};
/// use std::convert::Infallible;
///
/// struct NameOnly;
///
/// impl UploadFactory for NameOnly {
///     type Handle = String;
///     type Error = Infallible;
///
///     fn create_upload(
///         &mut self,
///         contents: &[u8],
///         filename: &str,
///         _content_type: &str,
///     ) -> Result<String, Infallible> {
///         Ok(format!("{filename} ({} bytes)", contents.len()))
///     }
/// }
///
/// let body = concat!(
///     "--B\r\n",
///     "Content-Disposition: form-data; name=\"note\"\r\n",
///     "\r\n",
///     "hello\r\n",
///     "--B\r\n",
///     "Content-Disposition: form-data; name=\"doc\"; filename=\"x.txt\"\r\n",
///     "Content-Type: text/plain\r\n",
///     "\r\n",
///     "file body\r\n",
///     "--B--\r\n",
/// );
///
/// let parser = Parser::new();
/// let data = parser
///     .parse(body.as_bytes(), "multipart/form-data; boundary=B", &mut NameOnly)
///     .unwrap();
///
/// assert_eq!(data.boundary(), "B");
/// assert_eq!(
///     data.field("note").and_then(|n| n.value()).map(String::as_str),
///     Some("hello"),
/// );
/// assert_eq!(
///     data.file("doc").and_then(|n| n.value()).map(String::as_str),
///     Some("x.txt (9 bytes)"),
/// );
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    anon_index: AnonymousIndex,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a fully buffered body against its `Content-Type` header
    /// value, invoking `factory` once per file part.
    ///
    /// Fatal faults (unusable content type or boundary, malformed part
    /// header lines, factory failures) abort the whole parse. Per-part
    /// anomalies the RFC tolerates — no header/body separator, no
    /// form-data disposition, a field without a name — skip that part and
    /// continue; skips are not observable in the result.
    pub fn parse<F: UploadFactory>(
        &self,
        body: &[u8],
        content_type: &str,
        factory: &mut F,
    ) -> Result<FormData<F::Handle>, ParseError> {
        let boundary = read_boundary(content_type)?;
        debug!("Resolved multipart boundary: {boundary}");

        let segments = split_segments(body, &boundary)?;
        trace!("Body split into {} part segments", segments.len());

        let mut registry = UploadRegistry::new();
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut files: Vec<(String, u64)> = Vec::new();

        for segment in segments {
            self.classify_segment(segment, factory, &mut registry, &mut fields, &mut files)?;
        }

        debug!(
            "Collected {} field parts and {} file parts",
            fields.len(),
            files.len()
        );

        let field_tree = build_tree(fields);
        let file_tree = registry.resolve(build_tree(files))?;

        Ok(FormData {
            boundary,
            fields: field_tree,
            files: file_tree,
        })
    }

    /// Convenience adapter: reads the body and `Content-Type` off a request
    /// abstraction, parses, and writes both trees back onto it.
    pub fn parse_request<R, F>(&self, request: &mut R, factory: &mut F) -> Result<(), ParseError>
    where
        F: UploadFactory,
        R: FormRequest<F::Handle>,
    {
        let data = self.parse(request.raw_body(), request.content_type_header(), factory)?;
        let (fields, files) = data.into_parts();
        request.set_parsed_fields(fields);
        request.set_uploaded_files(files);
        Ok(())
    }

    fn classify_segment<F: UploadFactory>(
        &self,
        segment: &[u8],
        factory: &mut F,
        registry: &mut UploadRegistry<F::Handle>,
        fields: &mut Vec<(String, String)>,
        files: &mut Vec<(String, u64)>,
    ) -> Result<(), ParseError> {
        let Some(part) = split_part(segment) else {
            trace!("Skipping part segment without header/body separator");
            return Ok(());
        };

        let headers = parse_part_headers(part.headers)?;
        let Some(disposition) = headers.get("content-disposition") else {
            trace!("Skipping part without a content-disposition header");
            return Ok(());
        };
        if disposition.value() != "form-data" {
            trace!("Skipping part with disposition '{}'", disposition.value());
            return Ok(());
        }

        let filename = disposition.param("filename").filter(|name| !name.is_empty());
        if let Some(filename) = filename {
            let content_type = headers
                .get("content-type")
                .map(HeaderLine::value)
                .unwrap_or(DEFAULT_PART_CONTENT_TYPE);

            let handle = factory
                .create_upload(part.body, filename, content_type)
                .map_err(ParseError::file_factory)?;

            let key = match disposition.param("name").filter(|name| !name.is_empty()) {
                Some(name) => name.to_string(),
                None => self.anon_index.next().to_string(),
            };

            let id = registry.register(handle);
            trace!(
                "File part '{key}': {filename} ({content_type}, {} bytes) held as placeholder {id}",
                part.body.len()
            );
            files.push((key, id));
        } else {
            let Some(name) = disposition.param("name").filter(|name| !name.is_empty()) else {
                trace!("Skipping field part without a form name");
                return Ok(());
            };

            let value = String::from_utf8_lossy(part.body).into_owned();
            trace!("Field part '{name}': {} bytes", value.len());
            fields.push((name.to_string(), value));
        }

        Ok(())
    }
}

/// Parses a part's header block into a map keyed by lowercase header name.
/// Duplicate header names keep the last occurrence. A malformed line aborts
/// the parse; an unparseable header block would leave every later routing
/// decision meaningless.
fn parse_part_headers(block: &[u8]) -> Result<HashMap<String, HeaderLine>, ParseError> {
    let text = String::from_utf8_lossy(block);
    let mut headers = HashMap::new();

    for line in text.split("\r\n") {
        let header = HeaderLine::parse(line)?;
        headers.insert(header.name().to_lowercase(), header);
    }

    Ok(headers)
}
