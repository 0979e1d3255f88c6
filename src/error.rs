use std::path::PathBuf;
use thiserror::Error;

use crate::format::DocumentKind;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced while opening, editing or saving a document
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported format `{ext}`: expected one of doc, docx, xls, xlsx")]
    UnsupportedFormat { ext: String },

    #[error("cannot open `{location}`: {reason}")]
    Open { location: String, reason: String },

    #[error("no {expected} accessor: the open document is a {found}")]
    Accessor {
        expected: DocumentKind,
        found: DocumentKind,
    },

    #[error("malformed package part `{part}`: {reason}")]
    Malformed { part: String, reason: String },

    #[error("cannot delete comment {id}: {reason}")]
    Delete { id: String, reason: String },

    #[error("cannot save {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    #[error("session is already closed")]
    SessionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub fn open(location: impl Into<String>, reason: impl ToString) -> Self {
        Error::Open {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(part: impl Into<String>, reason: impl ToString) -> Self {
        Error::Malformed {
            part: part.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.into())
    }
}
