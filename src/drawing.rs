//! Drawing node: the SVG markup produced by the rendering engine.
//!
//! DESIGN
//! ======
//! The drawing is kept as markup rather than a parsed tree. Its only
//! consumers mount it on a stage or serialize it for export, so the module
//! reads events up to the root element and stops there. That is enough to
//! read the declared bounds and to set the responsive-sizing attribute.
//! The prolog (declaration, doctype, comments) is skipped by the reader.

use std::borrow::Cow;
use std::num::ParseFloatError;
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::consts::EXPORT_FILENAME;
use crate::error::ErrorCode;
use crate::viewport::{Rect, ViewBox};

#[cfg(test)]
#[path = "drawing_test.rs"]
mod drawing_test;

/// Attribute that makes the root element scale to its container.
const PRESERVE_ASPECT_RATIO: (&str, &str) = ("preserveAspectRatio", "xMidYMid meet");

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while reading engine output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawingError {
    /// The first element of the output is not `<svg>`.
    #[error("engine output contains no <svg> root element")]
    MissingRoot,

    /// The markup before or inside the root start tag is not well-formed.
    #[error("malformed markup at byte {position}: {message}")]
    Malformed { position: usize, message: String },
}

impl ErrorCode for DrawingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRoot => "E_DRAWING_MISSING_ROOT",
            Self::Malformed { .. } => "E_DRAWING_MALFORMED",
        }
    }
}

// =============================================================================
// DRAWING
// =============================================================================

/// A rendered drawing: SVG markup plus the bounds its root element declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drawing {
    markup: String,
    declared: Option<ViewBox>,
}

impl Drawing {
    /// Wrap engine output, reading the declared bounds from the root tag.
    ///
    /// # Errors
    ///
    /// Returns a [`DrawingError`] if the root element is not a complete
    /// `<svg>` start tag.
    pub fn from_markup(markup: impl Into<String>) -> Result<Self, DrawingError> {
        let markup = markup.into();
        let root = root_tag(&markup)?;
        let declared = declared_bounds(&root.attrs);
        Ok(Self { markup, declared })
    }

    /// The full SVG markup.
    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Bounds declared by the root element's `viewBox`, or its `width`/`height`.
    #[must_use]
    pub fn view_box(&self) -> Option<ViewBox> {
        self.declared
    }

    /// Set `preserveAspectRatio="xMidYMid meet"` on the root element so the
    /// drawing scales with its container.
    #[must_use]
    pub fn responsive(self) -> Self {
        let (name, value) = PRESERVE_ASPECT_RATIO;
        self.with_root_attr(name, value)
    }

    /// Set or replace one attribute on the root `<svg>` element.
    ///
    /// Existing attribute values are re-escaped from their decoded form, so
    /// character references keep their meaning.
    #[must_use]
    pub fn with_root_attr(self, name: &str, value: &str) -> Self {
        let Ok(mut root) = root_tag(&self.markup) else {
            return self;
        };
        match root.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value.to_owned(),
            None => root.attrs.push((name.to_owned(), value.to_owned())),
        }

        let tag = root.start_tag();
        let mut markup = String::with_capacity(self.markup.len() + tag.len());
        markup.push_str(&self.markup[..root.range.start]);
        markup.push_str(&tag);
        markup.push_str(&self.markup[root.range.end..]);
        Self { markup, declared: self.declared }
    }

    /// Serialize for download under the fixed export filename.
    #[must_use]
    pub fn export(&self) -> Export {
        Export { filename: EXPORT_FILENAME, markup: self.markup.clone() }
    }
}

/// A serialized drawing ready to be written out by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub filename: &'static str,
    pub markup: String,
}

// =============================================================================
// ROOT TAG PARSING
// =============================================================================

/// The root start tag: its byte range in the markup and its decoded attributes.
struct RootTag {
    range: Range<usize>,
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl RootTag {
    /// Serialize the start tag, escaping every attribute value.
    fn start_tag(&self) -> String {
        let mut elem = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attrs {
            elem.push_attribute((key.as_str(), value.as_str()));
        }
        let close = if self.self_closing { "/>" } else { ">" };
        format!("<{}{close}", String::from_utf8_lossy(&elem))
    }
}

fn root_tag(markup: &str) -> Result<RootTag, DrawingError> {
    let mut reader = Reader::from_str(markup);
    let (start, self_closing) = loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => break (e, false),
            Ok(Event::Empty(e)) => break (e, true),
            Ok(Event::Eof) => return Err(DrawingError::MissingRoot),
            Ok(_) => {}
            Err(err) => {
                let position = offset(reader.error_position());
                return Err(DrawingError::Malformed { position, message: err.to_string() });
            }
        }
    };
    if start.local_name().as_ref() != b"svg" {
        return Err(DrawingError::MissingRoot);
    }

    // The reader stops just past '>'; '<' cannot occur inside a well-formed tag.
    let end = offset(reader.buffer_position());
    let begin = markup[..end].rfind('<').ok_or(DrawingError::MissingRoot)?;

    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| DrawingError::Malformed { position: begin, message: err.to_string() })?;
        let value = attr
            .unescape_value()
            .map_err(|err| DrawingError::Malformed { position: begin, message: err.to_string() })?;
        attrs.push((String::from_utf8_lossy(attr.key.as_ref()).into_owned(), Cow::into_owned(value)));
    }

    Ok(RootTag {
        range: begin..end,
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attrs,
        self_closing,
    })
}

fn offset(position: u64) -> usize {
    usize::try_from(position).unwrap_or(usize::MAX)
}

fn declared_bounds(attrs: &[(String, String)]) -> Option<ViewBox> {
    let get = |key: &str| attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

    if let Some(raw) = get("viewBox") {
        let nums: Result<Vec<f64>, _> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect();
        if let Ok([x, y, width, height]) = nums.as_deref() {
            let (x, y, width, height) = (*x, *y, *width, *height);
            if width > 0.0 && height > 0.0 {
                return Some(Rect::new(x, y, width, height));
            }
        }
    }

    match (get("width").and_then(parse_length), get("height").and_then(parse_length)) {
        (Some(Ok(width)), Some(Ok(height))) if width > 0.0 && height > 0.0 => {
            Some(Rect::new(0.0, 0.0, width, height))
        }
        _ => None,
    }
}

/// Parse an SVG length such as `"62pt"` or `"120px"`. Percentages have no
/// intrinsic size and yield `None`.
fn parse_length(raw: &str) -> Option<Result<f64, ParseFloatError>> {
    let raw = raw.trim();
    if raw.ends_with('%') {
        return None;
    }
    let number_end = raw
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .unwrap_or(raw.len());
    Some(raw[..number_end].parse())
}
