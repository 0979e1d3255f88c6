//! Host session abstraction
//!
//! A host opens a document into a session, hands out the text-document or
//! active-sheet accessor, and saves/closes the session. [`SessionGuard`] ties the
//! session lifetime to a scope so that it is closed on every exit path.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use crate::error::Result;
use crate::format::Format;
use crate::models::{Comment, CommentId};

/// Something that can open documents into editing sessions
pub trait Host {
    type Session: Session;

    fn open(&mut self, file_url: &str) -> Result<Self::Session>;
}

/// One open document
pub trait Session {
    /// Text-document accessor (doc/docx)
    fn active_document(&mut self) -> Result<&mut dyn CommentTarget>;

    /// Spreadsheet accessor (xls/xlsx)
    fn active_sheet(&mut self) -> Result<&mut dyn CommentTarget>;

    /// Persist the current state as `file_name` and return the written path
    fn save_as(&mut self, format: Format, file_name: &str) -> Result<PathBuf>;

    /// Release the session. Calling it twice is not an error.
    fn close(&mut self) -> Result<()>;
}

/// The comment surface of an open document or sheet
pub trait CommentTarget {
    /// Owned snapshot of every comment, in document order
    fn comments(&self) -> Result<Vec<Comment>>;

    fn delete_comment(&mut self, id: &CommentId) -> Result<()>;
}

/// Closes the wrapped session when dropped unless [`SessionGuard::close`] ran
pub struct SessionGuard<S: Session> {
    session: S,
    closed: bool,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    /// Close explicitly so that a close failure reaches the caller
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.session.close()
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        log::debug!("closing session on early exit");
        if let Err(err) = self.session.close() {
            log::warn!("failed to close session: {err}");
        }
    }
}
