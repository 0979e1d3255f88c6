//! Native host over Office Open XML packages
//!
//! `PackageHost` opens .docx and .xlsx files (local paths, `file://` or
//! `http(s)://` URLs) entirely in memory. Deletions are recorded against the
//! loaded package and only applied when the session is saved, so the source
//! file is never modified.

mod archive;
mod relationships;
mod source;
mod spreadsheet;
mod wordprocessing;
mod xml;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::format::{DocumentKind, Format};
use crate::host::{CommentTarget, Host, Session};
use crate::SheetScope;

use archive::Package;
use spreadsheet::Workbook;
use wordprocessing::WordDocument;

#[derive(Debug, Clone)]
pub struct PackageHost {
    output_dir: PathBuf,
    sheet_scope: SheetScope,
    fetch_timeout: Duration,
}

impl PackageHost {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let defaults = Settings::default();
        Self {
            output_dir: output_dir.into(),
            sheet_scope: defaults.sheet_scope,
            fetch_timeout: Duration::from_secs(defaults.fetch_timeout_secs),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            sheet_scope: settings.sheet_scope,
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
        }
    }

    pub fn with_sheet_scope(mut self, sheet_scope: SheetScope) -> Self {
        self.sheet_scope = sheet_scope;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Host for PackageHost {
    type Session = PackageSession;

    fn open(&mut self, file_url: &str) -> Result<PackageSession> {
        let bytes = source::fetch(file_url, self.fetch_timeout)?;
        let package = Package::from_bytes(file_url, bytes)?;

        let document = match package.kind()? {
            DocumentKind::Text => OpenDocument::Text(WordDocument::open(package)?),
            DocumentKind::Spreadsheet => {
                OpenDocument::Spreadsheet(Workbook::open(package, self.sheet_scope)?)
            }
        };

        Ok(PackageSession {
            output_dir: self.output_dir.clone(),
            document: Some(document),
        })
    }
}

#[derive(Debug)]
enum OpenDocument {
    Text(WordDocument),
    Spreadsheet(Workbook),
}

impl OpenDocument {
    fn kind(&self) -> DocumentKind {
        match self {
            OpenDocument::Text(_) => DocumentKind::Text,
            OpenDocument::Spreadsheet(_) => DocumentKind::Spreadsheet,
        }
    }

    fn render(&self) -> Result<Package> {
        match self {
            OpenDocument::Text(document) => document.render(),
            OpenDocument::Spreadsheet(workbook) => workbook.render(),
        }
    }
}

/// One package opened by [`PackageHost`]
#[derive(Debug)]
pub struct PackageSession {
    output_dir: PathBuf,
    document: Option<OpenDocument>,
}

impl PackageSession {
    fn document(&mut self) -> Result<&mut OpenDocument> {
        self.document.as_mut().ok_or(Error::SessionClosed)
    }
}

impl Session for PackageSession {
    fn active_document(&mut self) -> Result<&mut dyn CommentTarget> {
        match self.document()? {
            OpenDocument::Text(document) => Ok(document),
            other => Err(Error::Accessor {
                expected: DocumentKind::Text,
                found: other.kind(),
            }),
        }
    }

    fn active_sheet(&mut self) -> Result<&mut dyn CommentTarget> {
        match self.document()? {
            OpenDocument::Spreadsheet(workbook) => Ok(workbook),
            other => Err(Error::Accessor {
                expected: DocumentKind::Spreadsheet,
                found: other.kind(),
            }),
        }
    }

    fn save_as(&mut self, format: Format, file_name: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let document = self.document()?;

        if format.kind() != document.kind() {
            return Err(Error::Save {
                path,
                reason: format!("a {} cannot be saved as .{format}", document.kind()),
            });
        }
        if format.is_legacy_binary() {
            return Err(Error::Save {
                path,
                reason: format!("an OOXML package cannot be written as legacy binary .{format}"),
            });
        }

        let package = document.render()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::Save {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }
        package.save(&path).map_err(|e| Error::Save {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        log::debug!("saved {}", path.display());
        Ok(path)
    }

    fn close(&mut self) -> Result<()> {
        if self.document.take().is_some() {
            log::debug!("session closed");
        }
        Ok(())
    }
}
