use crate::error::IngestError;
use lopdf::Document;
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Resolves the format from a file name or path, rejecting anything we can't parse.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| IngestError::UnsupportedFormat(path.display().to_string()))
    }

    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            Self::Pdf => &LopdfExtractor,
            Self::Docx => &DocxExtractor,
            Self::PlainText => &PlainTextExtractor,
        }
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    /// Every page of the document in page order. Pages without extractable
    /// text are kept with an empty string.
    pub fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::Parse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    debug!(page = page_no, %error, "pdf page has no extractable text");
                    String::new()
                }
            };

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

impl TextExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let pages = self.extract_pages(bytes)?;
        Ok(pages
            .into_iter()
            .map(|page| page.text)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[derive(Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    fn read_body_xml(bytes: &[u8]) -> Result<String, IngestError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|error| IngestError::Parse(format!("docx archive: {error}")))?;
        let mut part = archive
            .by_name(DOCX_BODY_PART)
            .map_err(|error| IngestError::Parse(format!("docx {DOCX_BODY_PART}: {error}")))?;

        let mut xml = String::new();
        part.read_to_string(&mut xml)
            .map_err(|error| IngestError::Parse(format!("docx {DOCX_BODY_PART}: {error}")))?;
        Ok(xml)
    }

    /// Paragraph texts of a WordprocessingML body, in document order.
    pub fn paragraphs(&self, xml: &str) -> Result<Vec<String>, IngestError> {
        let paragraph_re = Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)")?;
        let run_re =
            Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:(tab|br|cr)(?:\s[^>]*)?/>")?;
        let entity_re = Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);")?;

        let paragraphs = paragraph_re
            .captures_iter(xml)
            .map(|paragraph| {
                let body = paragraph.get(1).map_or("", |body| body.as_str());
                let mut text = String::new();
                for run in run_re.captures_iter(body) {
                    match (run.get(1), run.get(2).map(|kind| kind.as_str())) {
                        (Some(content), _) => text.push_str(content.as_str()),
                        (None, Some("tab")) => text.push('\t'),
                        (None, Some(_)) => text.push('\n'),
                        (None, None) => {}
                    }
                }
                decode_entities(&entity_re, &text)
            })
            .collect();

        Ok(paragraphs)
    }
}

impl TextExtractor for DocxExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let xml = Self::read_body_xml(bytes)?;
        Ok(self.paragraphs(&xml)?.join(" "))
    }
}

fn decode_entities(entity_re: &Regex, text: &str) -> String {
    entity_re
        .replace_all(text, |captures: &Captures| {
            let entity = &captures[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(|code| code.ok())
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| captures[0].to_string(), String::from)
        })
        .into_owned()
}

#[derive(Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|error| IngestError::Parse(format!("text file is not valid utf-8: {error}")))
    }
}

/// Extracts raw text from in-memory file contents, dispatching on the
/// identifier's extension.
pub fn parse_bytes(identifier: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let format = DocumentFormat::from_path(Path::new(identifier))?;
    let text = format.extractor().extract_text(bytes)?;
    debug!(identifier, ?format, chars = text.len(), "parsed document");
    Ok(text)
}

/// Reads and extracts a file from disk. The format is checked before the file
/// is touched.
pub fn parse_document(path: &Path) -> Result<String, IngestError> {
    let format = DocumentFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let text = format.extractor().extract_text(&bytes)?;
    debug!(path = %path.display(), ?format, chars = text.len(), "parsed document");
    Ok(text)
}
