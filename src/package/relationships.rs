//! Package relationships and content types
//!
//! Parts reference each other through `_rels/*.rels` parts. Dropping a part
//! means removing it, its own relationships, the relationship pointing at it,
//! and its `[Content_Types].xml` override.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::archive::{Package, CONTENT_TYPES_PART};
use super::xml::{attr, remove_elements};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Relationship {
    pub(crate) id: String,
    pub(crate) rel_type: String,
    pub(crate) target: String,
    pub(crate) external: bool,
}

impl Relationship {
    /// Relationship types differ by namespace between producers; the last segment is stable
    pub(crate) fn is(&self, kind: &str) -> bool {
        !self.external && self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the directory of its source part
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

pub(crate) fn parse(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    relationships.push(Relationship {
                        id,
                        rel_type: attr(e, b"Type").unwrap_or_default(),
                        target,
                        external: attr(e, b"TargetMode").as_deref() == Some("External"),
                    });
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Relationships declared by `part`; a part without a `.rels` part has none
pub(crate) fn relationships_of(package: &Package, part: &str) -> Result<Vec<Relationship>> {
    match package.part(&rels_path(part)) {
        Some(xml) => parse(xml),
        None => Ok(Vec::new()),
    }
}

/// Removes `part_name` and every reference to it from `owner_part`
pub(crate) fn detach_part(
    package: &mut Package,
    owner_part: &str,
    rel_id: &str,
    part_name: &str,
) -> Result<()> {
    log::debug!("dropping part {part_name}");
    package.remove_part(part_name);
    package.remove_part(&rels_path(part_name));

    let owner_rels = rels_path(owner_part);
    if let Some(xml) = package.part(&owner_rels) {
        let filtered = remove_elements(xml, |e| {
            e.local_name().as_ref() == b"Relationship" && attr(e, b"Id").as_deref() == Some(rel_id)
        })?;
        package.set_part(&owner_rels, filtered);
    }

    if let Some(xml) = package.part(CONTENT_TYPES_PART) {
        let part_uri = format!("/{part_name}");
        let filtered = remove_elements(xml, |e| {
            e.local_name().as_ref() == b"Override"
                && attr(e, b"PartName").is_some_and(|name| name.eq_ignore_ascii_case(&part_uri))
        })?;
        package.set_part(CONTENT_TYPES_PART, filtered);
    }

    Ok(())
}
