//! nocomment: strip every comment from Word and Excel documents
//!
//! This library opens a document through a host session, deletes each comment
//! the session exposes, and saves the result as `output.<ext>`. The bundled
//! [`PackageHost`] edits .docx and .xlsx packages directly; other hosts can be
//! plugged in through the [`Host`] trait.

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod host;
pub mod models;
pub mod package;

use serde::{Deserialize, Serialize};

/// Which sheets the spreadsheet accessor covers
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetScope {
    /// Only the workbook's active tab
    ActiveSheet,
    /// Every worksheet in the workbook
    Workbook,
}

/// Report format for the command line
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

// Re-export commonly used types
pub use config::Settings;
pub use convert::{convert, list_comments, ConversionReport};
pub use error::{Error, Result};
pub use format::{output_file_name, DocumentKind, Format};
pub use host::{CommentTarget, Host, Session, SessionGuard};
pub use models::{Comment, CommentId};
pub use package::{PackageHost, PackageSession};
