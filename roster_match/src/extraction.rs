// Name extraction from images, through an external capability.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use snafu::{prelude::*, Snafu};

use crate::config::ListKind;

/// An encoded image (or any document) as carried by a data URI:
/// `data:<mime type>;base64,<data>`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ImagePayload {
    mime_type: String,
    data: String,
}

impl ImagePayload {
    pub const DEFAULT_MIME_TYPE: &'static str = "image/png";

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> ImagePayload {
        ImagePayload {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Accepts a full data URI or a bare base64 string (assumed to be a PNG image).
    pub fn from_data_uri(s: &str) -> ImagePayload {
        match s.split_once(',') {
            Some((header, data)) => {
                let mime_type = header
                    .trim_start_matches("data:")
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(ImagePayload::DEFAULT_MIME_TYPE);
                ImagePayload {
                    mime_type: mime_type.to_string(),
                    data: data.trim().to_string(),
                }
            }
            None => ImagePayload {
                mime_type: ImagePayload::DEFAULT_MIME_TYPE.to_string(),
                data: s.trim().to_string(),
            },
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64-encoded content, without the data URI header.
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// What the extraction capability receives: one image and the instruction
/// matching the kind of list it shows.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub image: &'a ImagePayload,
    pub kind: ListKind,
    pub instruction: &'a str,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExtractionFailure {
    #[snafu(display("Unsupported payload type {mime_type}"))]
    Unsupported { mime_type: String },
    #[snafu(display("Could not decode the payload"))]
    Decode { source: base64::DecodeError },
    #[snafu(display("The payload is not valid UTF-8 text"))]
    Utf8 { source: std::string::FromUtf8Error },
    #[snafu(display("Extraction failed: {message}"))]
    Failed { message: String },
}

/// A capability that reads names out of an image.
///
/// Implementations answer with free text, one name per line.
pub trait NameExtractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure>;
}

/// Splits the free-text answer of an extraction capability into names.
pub fn split_names(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| l.chars().count() > 1)
        .map(|l| l.to_string())
        .collect()
}

/// Extracts the names shown in one image.
///
/// A failing extraction gives an empty list: results are merged across
/// several images, and one bad image must not abort the run.
pub fn extract_names(
    extractor: &dyn NameExtractor,
    image: &ImagePayload,
    kind: ListKind,
) -> Vec<String> {
    let request = ExtractionRequest {
        image,
        kind,
        instruction: kind.instruction(),
    };
    match extractor.extract(&request) {
        Ok(text) => {
            let names = split_names(&text);
            debug!("extract_names: {:?}: {} names", kind, names.len());
            names
        }
        Err(e) => {
            warn!(
                "extract_names: extraction failed for a {} payload, ignoring it: {}",
                image.mime_type(),
                e
            );
            vec![]
        }
    }
}

lazy_static! {
    /// Call UI decorations: "(Host)", "(Host, me)", "[Guest]", "(المضيف)"
    static ref CALL_UI_MARKER: Regex = Regex::new(
        r"(?i)\s*[(\[][^)\]]*\b(?:host|co-host|cohost|me|guest|you|المضيف|مضيف|أنا|انا|ضيف)\b[^)\]]*[)\]]"
    )
    .unwrap();
    /// Row numbers: "1.", "12)", "3 -", "4 "
    static ref ENUMERATOR: Regex = Regex::new(r"^\s*\d+(?:\s*[.)\-:]\s*|\s+)").unwrap();
}

/// Reads participant or roster lists that were saved as text.
///
/// Images are reported as unsupported. Participant lines lose their call UI
/// markers and roster lines lose their row numbers. Lines without any letter
/// (dates, counters) are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn clean_line(line: &str, kind: ListKind) -> String {
        if !line.chars().any(char::is_alphabetic) {
            return "".to_string();
        }
        let cleaned = match kind {
            ListKind::SessionParticipants => CALL_UI_MARKER.replace_all(line, "").to_string(),
            ListKind::OfficialRoster => ENUMERATOR.replace(line, "").to_string(),
        };
        cleaned.trim().to_string()
    }
}

impl NameExtractor for PlainTextExtractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure> {
        let mime_type = request.image.mime_type();
        ensure!(mime_type.starts_with("text/"), UnsupportedSnafu { mime_type });
        let bytes = request.image.decode().context(DecodeSnafu)?;
        let text = String::from_utf8(bytes).context(Utf8Snafu)?;
        let text = text.trim_start_matches('\u{feff}');
        let cleaned: Vec<String> = text
            .lines()
            .map(|l| PlainTextExtractor::clean_line(l, request.kind))
            .collect();
        Ok(cleaned.join("\n"))
    }
}
