
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{DocQaError, Result};

/// Segment and chunk metadata, ordered for stable serialisation
pub type Metadata = BTreeMap<String, String>;

pub const SOURCE_KEY: &str = "source";
pub const PAGE_KEY: &str = "page";
pub const HEADING_PATH_KEY: &str = "heading_path";

/// A contiguous piece of a document's text plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub content: String,
    pub metadata: Metadata,
}

impl Segment {
    fn new(content: String) -> Self {
        Self {
            content,
            metadata: Metadata::new(),
        }
    }

    fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Markdown,
}

impl DocumentFormat {
    /// Detect the format from the file extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "md" => Ok(Self::Markdown),
            "" => Err(DocQaError::UnsupportedFormat(format!(
                "{} has no extension",
                path.display()
            ))),
            other => Err(DocQaError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Text => write!(f, "txt"),
            Self::Markdown => write!(f, "md"),
        }
    }
}

#[inline]
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_ok()
}

/// A parsed file. Lives only long enough to be chunked.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub segments: Vec<Segment>,
}

/// The file name component of `path`, used as the `source` of everything
/// loaded from it
#[inline]
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Parse a supported file into segments. Every segment's `source` is the
/// file's basename.
#[inline]
pub fn load_document(path: &Path) -> Result<LoadedDocument> {
    let format = DocumentFormat::from_path(path)?;
    debug!("Loading {} as {}", path.display(), format);

    let mut segments = match format {
        DocumentFormat::Pdf => load_pdf(path)?,
        DocumentFormat::Text => vec![Segment::new(read_utf8(path)?)],
        DocumentFormat::Markdown => markdown_sections(&read_utf8(path)?),
    };

    let source = source_name(path);
    for segment in &mut segments {
        segment.metadata.insert(SOURCE_KEY.to_string(), source.clone());
    }

    debug!("Loaded {} segments from {}", segments.len(), source);

    Ok(LoadedDocument {
        path: path.to_path_buf(),
        format,
        segments,
    })
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|e| DocQaError::Parse(format!("{} is not valid UTF-8: {}", path.display(), e)))
}

fn load_pdf(path: &Path) -> Result<Vec<Segment>> {
    let document = lopdf::Document::load(path)
        .map_err(|e| DocQaError::Parse(format!("Failed to load PDF {}: {}", path.display(), e)))?;

    let mut segments = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => {
                segments.push(
                    Segment::new(text.trim().to_string())
                        .with_meta(PAGE_KEY, page_number.to_string()),
                );
            }
            Ok(_) => debug!("Page {} of {} has no text", page_number, path.display()),
            Err(e) => warn!(
                "Could not extract text from page {} of {}: {}",
                page_number,
                path.display(),
                e
            ),
        }
    }

    if segments.is_empty() {
        return Err(DocQaError::Parse(format!(
            "No text content could be extracted from {}",
            path.display()
        )));
    }

    Ok(segments)
}

/// Split markdown into one segment per heading section, tagging each with its
/// heading path ("Guide > Install"). A section's content starts with its
/// heading line. Text before the first heading has no path, so a document
/// without headings is a single segment. Never returns an empty list.
fn markdown_sections(markdown: &str) -> Vec<Segment> {
    let mut sections = Vec::new();
    let mut heading_stack: Vec<(u8, String)> = Vec::new();

    let mut current_content = String::new();
    let mut current_heading_text = String::new();
    let mut in_heading = false;

    let mut flush = |content: &mut String, stack: &[(u8, String)]| {
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            let mut segment = Segment::new(trimmed.to_string());
            if !stack.is_empty() {
                segment = segment.with_meta(HEADING_PATH_KEY, build_heading_path(stack));
            }
            sections.push(segment);
        }
        content.clear();
    };

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                flush(&mut current_content, &heading_stack);
                in_heading = true;
                current_heading_text.clear();
            }
            Event::Start(Tag::CodeBlock(_)) => current_content.push_str("```\n"),
            Event::Start(Tag::Paragraph | Tag::List(_)) => {
                if !current_content.is_empty() && !current_content.ends_with('\n') {
                    current_content.push('\n');
                }
            }
            Event::Start(Tag::Item) => current_content.push_str("- "),
            Event::End(TagEnd::Heading(level)) => {
                let heading = current_heading_text.trim();
                if in_heading && !heading.is_empty() {
                    update_heading_stack(
                        &mut heading_stack,
                        heading_level_to_u8(level),
                        heading.to_string(),
                    );
                    current_content.push_str(heading);
                    current_content.push_str("\n\n");
                }
                in_heading = false;
            }
            Event::End(TagEnd::CodeBlock) => current_content.push_str("```\n"),
            Event::End(TagEnd::Paragraph) => current_content.push_str("\n\n"),
            Event::End(TagEnd::Item) => current_content.push('\n'),
            Event::Text(text) | Event::Code(text) => {
                if in_heading {
                    current_heading_text.push_str(&text);
                } else {
                    current_content.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_heading {
                    current_heading_text.push(' ');
                } else {
                    current_content.push('\n');
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => current_content.push_str(&html),
            _ => {}
        }
    }
    flush(&mut current_content, &heading_stack);

    if sections.is_empty() {
        sections.push(Segment::new(markdown.trim().to_string()));
    }
    sections
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn update_heading_stack(stack: &mut Vec<(u8, String)>, level: u8, text: String) {
    stack.retain(|(l, _)| *l < level);
    stack.push((level, text));
}

fn build_heading_path(stack: &[(u8, String)]) -> String {
    stack
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}
