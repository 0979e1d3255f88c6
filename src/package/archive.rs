//! Zip container I/O
//!
//! Packages are held fully in memory as an ordered list of parts so that a
//! save writes every untouched part back byte-for-byte, in its original order
//! and with its original compression method.

use std::ffi::OsString;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::format::DocumentKind;

/// Signature of OLE compound files (legacy .doc / .xls)
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Upper bound on the buffer reserved per entry before reading it
const PREALLOCATION_LIMIT: usize = 64 << 20;

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const WORD_DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

#[derive(Debug, Clone)]
pub(crate) struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Reads a package, rejecting legacy binary files and non-zip input
    pub(crate) fn from_bytes(location: &str, bytes: Vec<u8>) -> Result<Self> {
        if bytes.starts_with(&OLE_MAGIC) {
            return Err(Error::open(
                location,
                "legacy binary Office file; only OOXML packages (.docx, .xlsx) can be edited",
            ));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::open(location, format!("not an OOXML package ({e})")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let mut data = Vec::with_capacity(read_capacity(file.size()));
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
            });
        }

        Ok(Self { parts })
    }

    /// Main document part decides the kind
    pub(crate) fn kind(&self) -> Result<DocumentKind> {
        if self.contains(WORD_DOCUMENT_PART) {
            Ok(DocumentKind::Text)
        } else if self.contains(WORKBOOK_PART) {
            Ok(DocumentKind::Spreadsheet)
        } else {
            Err(Error::malformed(
                CONTENT_TYPES_PART,
                "package has neither word/document.xml nor xl/workbook.xml",
            ))
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.parts
            .iter()
            .position(|part| part.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub(crate) fn part(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|i| self.parts[i].data.as_slice())
    }

    pub(crate) fn require(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| Error::malformed(name, "part is missing from the package"))
    }

    /// Replaces a part's bytes, keeping its position and compression
    pub(crate) fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.position(name) {
            Some(i) => self.parts[i].data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
                compression: CompressionMethod::Deflated,
            }),
        }
    }

    pub(crate) fn remove_part(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.parts.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn part_names(&self) -> Vec<String> {
        self.parts.iter().map(|part| part.name.clone()).collect()
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for part in &self.parts {
            // Writers only support stored and deflated reliably
            let method = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(&part.data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Writes to `<path>.partial` first, then renames into place
    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let partial = partial_path(path);

        if let Err(err) = fs::write(&partial, &bytes).and_then(|_| fs::rename(&partial, path)) {
            let _ = fs::remove_file(&partial);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Buffer to reserve for an entry; the declared size comes from the archive and is not trusted
fn read_capacity(declared_size: u64) -> usize {
    usize::try_from(declared_size)
        .unwrap_or(usize::MAX)
        .min(PREALLOCATION_LIMIT)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
