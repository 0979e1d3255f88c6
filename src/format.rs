//! Document formats and extension dispatch
//!
//! The extension token decides which host accessor is used: text documents go
//! through the active-document accessor, spreadsheets through the active-sheet
//! accessor. Anything outside the four recognized tokens is rejected here, before
//! a host session exists.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Document formats the converter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Doc,
    Docx,
    Xls,
    Xlsx,
}

/// Which host accessor a format is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Spreadsheet,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Doc, Format::Docx, Format::Xls, Format::Xlsx];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Doc => "doc",
            Format::Docx => "docx",
            Format::Xls => "xls",
            Format::Xlsx => "xlsx",
        }
    }

    pub fn kind(self) -> DocumentKind {
        match self {
            Format::Doc | Format::Docx => DocumentKind::Text,
            Format::Xls | Format::Xlsx => DocumentKind::Spreadsheet,
        }
    }

    /// Pre-2007 binary formats, as opposed to zip-based OOXML packages
    pub fn is_legacy_binary(self) -> bool {
        matches!(self, Format::Doc | Format::Xls)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| format.extension() == normalized)
            .ok_or_else(|| Error::UnsupportedFormat {
                ext: ext.to_string(),
            })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Text => f.write_str("text document"),
            DocumentKind::Spreadsheet => f.write_str("spreadsheet"),
        }
    }
}

/// The fixed output name: `output.<ext>`, never derived from the source name
pub fn output_file_name(format: Format) -> String {
    format!("output.{}", format.extension())
}

/// Extension of the last path segment of a path or URL, ignoring query and fragment
pub fn infer_extension(file_url: &str) -> Option<String> {
    let without_fragment = file_url.split('#').next().unwrap_or(file_url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    let segment = without_query.rsplit(['/', '\\']).next()?;

    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
