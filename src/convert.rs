//! Comment-stripping conversion
//!
//! `convert()` runs the whole sequence against a host:
//! 1. Resolve the extension to a format (unsupported tokens stop here)
//! 2. Open the source inside a guarded session
//! 3. Pick the text-document or active-sheet accessor
//! 4. Snapshot the comments and delete each one in snapshot order
//! 5. Save as `output.<ext>` and close
//!
//! The first failure aborts the sequence; the guard still closes the session.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::format::{output_file_name, DocumentKind, Format};
use crate::host::{CommentTarget, Host, Session, SessionGuard};
use crate::models::Comment;

/// Outcome of a successful conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub source: String,
    pub format: Format,
    pub output: PathBuf,
    pub removed: Vec<Comment>,
}

pub fn convert<H: Host>(host: &mut H, file_url: &str, ext: &str) -> Result<ConversionReport> {
    let format: Format = ext.parse()?;
    let output_name = output_file_name(format);

    log::debug!("opening {file_url} as {format}");
    let mut session = SessionGuard::new(host.open(file_url)?);

    let removed = {
        let target = select_target(&mut *session, format.kind())?;
        let snapshot = target.comments()?;
        log::debug!("found {} comment(s)", snapshot.len());

        for comment in &snapshot {
            log::debug!("deleting comment {}", comment.id);
            target.delete_comment(&comment.id)?;
        }
        snapshot
    };

    let output = session.save_as(format, &output_name)?;
    session.close()?;

    log::info!(
        "removed {} comment(s) from {file_url}, wrote {}",
        removed.len(),
        output.display()
    );

    Ok(ConversionReport {
        source: file_url.to_string(),
        format,
        output,
        removed,
    })
}

/// Read-only pass: the comments `convert()` would delete
pub fn list_comments<H: Host>(host: &mut H, file_url: &str, ext: &str) -> Result<Vec<Comment>> {
    let format: Format = ext.parse()?;

    let mut session = SessionGuard::new(host.open(file_url)?);
    let comments = select_target(&mut *session, format.kind())?.comments()?;
    session.close()?;

    Ok(comments)
}

fn select_target<S: Session>(session: &mut S, kind: DocumentKind) -> Result<&mut dyn CommentTarget> {
    match kind {
        DocumentKind::Text => session.active_document(),
        DocumentKind::Spreadsheet => session.active_sheet(),
    }
}
