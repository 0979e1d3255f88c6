//! Comment editing for Word (.docx) packages
//!
//! Comments live in `word/comments.xml` and are anchored in the story parts
//! (body, headers, footers, notes) by range markers and a reference run. Newer
//! producers add `commentsExtended`, `commentsIds` and `commentsExtensible`
//! parts keyed by paragraph id and durable id.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;

use super::archive::{Package, WORD_DOCUMENT_PART};
use super::relationships::{detach_part, relationships_of, resolve_target, Relationship};
use super::xml::{attr, remove_containers, remove_elements};
use crate::error::{Error, Result};
use crate::host::CommentTarget;
use crate::models::{Comment, CommentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentPartRole {
    Comments,
    Extended,
    Ids,
    Extensible,
}

impl CommentPartRole {
    fn from_relationship(rel: &Relationship) -> Option<Self> {
        if rel.is("comments") {
            Some(Self::Comments)
        } else if rel.is("commentsExtended") {
            Some(Self::Extended)
        } else if rel.is("commentsIds") {
            Some(Self::Ids)
        } else if rel.is("commentsExtensible") {
            Some(Self::Extensible)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
struct CommentPart {
    role: CommentPartRole,
    rel_id: String,
    name: String,
}

#[derive(Debug, Clone)]
struct WordComment {
    comment: Comment,
    /// `w14:paraId` of each paragraph in the comment body
    para_ids: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct WordDocument {
    package: Package,
    parts: Vec<CommentPart>,
    comments: Vec<WordComment>,
    deleted: HashSet<CommentId>,
}

impl WordDocument {
    pub(crate) fn open(package: Package) -> Result<Self> {
        package.require(WORD_DOCUMENT_PART)?;

        let parts: Vec<CommentPart> = relationships_of(&package, WORD_DOCUMENT_PART)?
            .into_iter()
            .filter_map(|rel| {
                let role = CommentPartRole::from_relationship(&rel)?;
                Some(CommentPart {
                    role,
                    name: resolve_target(WORD_DOCUMENT_PART, &rel.target),
                    rel_id: rel.id,
                })
            })
            .collect();

        let comments = match parts
            .iter()
            .find(|part| part.role == CommentPartRole::Comments)
            .and_then(|part| package.part(&part.name).map(|xml| (part, xml)))
        {
            Some((part, xml)) => parse_comments(&part.name, xml)?,
            None => Vec::new(),
        };
        log::debug!("docx package has {} comment(s)", comments.len());

        Ok(Self {
            package,
            parts,
            comments,
            deleted: HashSet::new(),
        })
    }

    /// The package with every deleted comment removed; the loaded package is untouched
    pub(crate) fn render(&self) -> Result<Package> {
        let mut package = self.package.clone();
        if self.deleted.is_empty() {
            return Ok(package);
        }

        let ids: HashSet<&str> = self.deleted.iter().map(CommentId::as_str).collect();
        let para_ids: HashSet<&str> = self
            .comments
            .iter()
            .filter(|c| self.deleted.contains(&c.comment.id))
            .flat_map(|c| c.para_ids.iter().map(String::as_str))
            .collect();

        for name in package.part_names() {
            if !self.is_story_part(&name) {
                continue;
            }
            let Some(xml) = package.part(&name) else {
                continue;
            };
            if !xml.windows(9).any(|w| w == b"w:comment") {
                continue;
            }
            let stripped = strip_comment_markers(xml, &ids)?;
            package.set_part(&name, stripped);
        }

        if self.deleted.len() == self.comments.len() {
            for part in &self.parts {
                detach_part(&mut package, WORD_DOCUMENT_PART, &part.rel_id, &part.name)?;
            }
            return Ok(package);
        }

        let durable_ids = match self.part_of(CommentPartRole::Ids) {
            Some(part) => match package.part(&part.name) {
                Some(xml) => durable_ids_for(xml, &para_ids)?,
                None => HashSet::new(),
            },
            None => HashSet::new(),
        };

        for part in &self.parts {
            let Some(xml) = package.part(&part.name) else {
                continue;
            };
            let filtered = match part.role {
                CommentPartRole::Comments => remove_elements(xml, |e| {
                    e.name().as_ref() == b"w:comment"
                        && attr(e, b"w:id").is_some_and(|id| ids.contains(id.as_str()))
                })?,
                CommentPartRole::Extended => remove_elements(xml, |e| {
                    e.name().as_ref() == b"w15:commentEx"
                        && attr(e, b"w15:paraId").is_some_and(|id| para_ids.contains(id.as_str()))
                })?,
                CommentPartRole::Ids => remove_elements(xml, |e| {
                    e.name().as_ref() == b"w16cid:commentId"
                        && attr(e, b"w16cid:paraId")
                            .is_some_and(|id| para_ids.contains(id.as_str()))
                })?,
                CommentPartRole::Extensible => remove_elements(xml, |e| {
                    e.name().as_ref() == b"w16cex:commentExtensible"
                        && attr(e, b"w16cex:durableId")
                            .is_some_and(|id| durable_ids.contains(&id))
                })?,
            };
            package.set_part(&part.name, filtered);
        }

        Ok(package)
    }

    fn part_of(&self, role: CommentPartRole) -> Option<&CommentPart> {
        self.parts.iter().find(|part| part.role == role)
    }

    /// Body, header, footer and note parts; anything under word/ except the comment parts
    fn is_story_part(&self, name: &str) -> bool {
        name.starts_with("word/")
            && name.ends_with(".xml")
            && !name.contains("/_rels/")
            && !self
                .parts
                .iter()
                .any(|part| part.name.eq_ignore_ascii_case(name))
    }
}

impl CommentTarget for WordDocument {
    fn comments(&self) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .iter()
            .filter(|c| !self.deleted.contains(&c.comment.id))
            .map(|c| c.comment.clone())
            .collect())
    }

    fn delete_comment(&mut self, id: &CommentId) -> Result<()> {
        if !self.comments.iter().any(|c| &c.comment.id == id) {
            return Err(Error::Delete {
                id: id.to_string(),
                reason: "no such comment in the document".to_string(),
            });
        }
        if !self.deleted.insert(id.clone()) {
            return Err(Error::Delete {
                id: id.to_string(),
                reason: "comment was already deleted".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_comments(part_name: &str, xml: &[u8]) -> Result<Vec<WordComment>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut comments = Vec::new();
    let mut current: Option<WordComment> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) if e.name().as_ref() == b"w:comment" => {
                current = Some(start_comment(part_name, e)?);
            }
            Event::Empty(ref e) if e.name().as_ref() == b"w:comment" => {
                comments.push(start_comment(part_name, e)?);
            }
            Event::End(ref e) if e.name().as_ref() == b"w:comment" => {
                if let Some(mut finished) = current.take() {
                    let trimmed = finished.comment.text.trim_end().len();
                    finished.comment.text.truncate(trimmed);
                    comments.push(finished);
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"w:p" => {
                if let Some(open) = current.as_mut() {
                    if !open.comment.text.is_empty() {
                        open.comment.text.push('\n');
                    }
                    if let Some(para_id) = attr(e, b"w14:paraId") {
                        open.para_ids.push(para_id);
                    }
                }
            }
            Event::Start(ref e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(ref e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(ref e) if in_text => {
                if let Some(open) = current.as_mut() {
                    open.comment.text.push_str(&e.unescape()?);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

fn start_comment(part_name: &str, e: &BytesStart) -> Result<WordComment> {
    let id = attr(e, b"w:id").ok_or_else(|| Error::malformed(part_name, "w:comment without w:id"))?;
    Ok(WordComment {
        comment: Comment::new(id, "").with_author(attr(e, b"w:author")),
        para_ids: Vec::new(),
    })
}

/// Durable ids that `commentsIds.xml` maps to the given paragraph ids
fn durable_ids_for(xml: &[u8], para_ids: &HashSet<&str>) -> Result<HashSet<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut durable = HashSet::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"w16cid:commentId" => {
                let linked = attr(e, b"w16cid:paraId").is_some_and(|id| para_ids.contains(id.as_str()));
                if linked {
                    if let Some(id) = attr(e, b"w16cid:durableId") {
                        durable.insert(id);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(durable)
}

/// Removes range markers and reference runs of the given comment ids from a story part
fn strip_comment_markers(xml: &[u8], ids: &HashSet<&str>) -> Result<Vec<u8>> {
    let without_runs = remove_containers(xml, b"w:r", |events| is_reference_run(events, ids))?;

    remove_elements(&without_runs, |e| {
        matches!(
            e.name().as_ref(),
            b"w:commentRangeStart" | b"w:commentRangeEnd" | b"w:commentReference"
        ) && is_marked(e, ids)
    })
}

/// True when the run holds nothing but run properties and references to deleted comments
fn is_reference_run(events: &[Event<'static>], ids: &HashSet<&str>) -> bool {
    let mut depth = 0usize;
    let mut references = false;

    for event in events {
        match event {
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Start(e) | Event::Empty(e) if depth == 1 => {
                match e.name().as_ref() {
                    b"w:rPr" => {}
                    b"w:commentReference" if is_marked(e, ids) => references = true,
                    _ => return false,
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::Start(_) => depth += 1,
            Event::Text(text) if depth == 1 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return false;
                }
            }
            _ if depth == 1 => return false,
            _ => {}
        }
    }

    references
}

fn is_marked(e: &BytesStart, ids: &HashSet<&str>) -> bool {
    attr(e, b"w:id").is_some_and(|id| ids.contains(id.as_str()))
}
