//! Source resolution
//!
//! `http(s)://` locations are downloaded, `file://` URLs are mapped to local
//! paths, and anything else is read as a filesystem path.

use reqwest::Url;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub(crate) fn fetch(file_url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let lower = file_url.to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        download(file_url, timeout)
    } else if lower.starts_with("file:") {
        let path = Url::parse(file_url)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| Error::open(file_url, "not a valid file:// URL"))?;
        read_local(file_url, &path)
    } else {
        read_local(file_url, Path::new(file_url))
    }
}

fn read_local(location: &str, path: &Path) -> Result<Vec<u8>> {
    log::debug!("reading {}", path.display());
    fs::read(path).map_err(|e| Error::open(location, e))
}

fn download(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    log::debug!("downloading {url}");
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::open(url, e))?;

    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::open(url, e))?;

    let bytes = response.bytes().map_err(|e| Error::open(url, e))?;
    Ok(bytes.to_vec())
}
