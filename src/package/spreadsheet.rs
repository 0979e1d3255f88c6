//! Comment editing for Excel (.xlsx) packages
//!
//! Each worksheet links its own comments part (cell notes), a legacy VML
//! drawing holding the note shapes, and optionally threaded comments. All three
//! are keyed by cell reference, so a deleted comment is tracked as a
//! (sheet, cell) pair.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use super::archive::{Package, WORKBOOK_PART};
use super::relationships::{detach_part, relationships_of, resolve_target, Relationship};
use super::xml::{attr, attr_local, count_elements, remove_containers, remove_elements};
use crate::SheetScope;
use crate::error::{Error, Result};
use crate::host::CommentTarget;
use crate::models::{Comment, CommentId};

static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap());

/// Zero-based (row, column) of an A1-style reference
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let captures = CELL_REF.captures(reference.trim())?;
    let column = captures[1]
        .to_ascii_uppercase()
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1));
    let row: u32 = captures[2].parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, column - 1))
}

/// A1-style reference from a zero-based (row, column)
pub(crate) fn cell_ref(row: u32, column: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

fn canonical_ref(reference: &str) -> String {
    match parse_cell_ref(reference) {
        Some((row, column)) => cell_ref(row, column),
        None => reference.trim().to_ascii_uppercase(),
    }
}

#[derive(Debug, Clone)]
struct Link {
    rel_id: String,
    part: String,
}

impl Link {
    fn from_relationship(source_part: &str, rel: &Relationship) -> Self {
        Self {
            rel_id: rel.id.clone(),
            part: resolve_target(source_part, &rel.target),
        }
    }
}

#[derive(Debug, Clone)]
struct SheetComment {
    comment: Comment,
    cell: String,
}

#[derive(Debug)]
struct Sheet {
    name: String,
    part: String,
    comments_link: Option<Link>,
    vml_link: Option<Link>,
    threaded_links: Vec<Link>,
    comments: Vec<SheetComment>,
}

impl Sheet {
    fn load(package: &Package, name: String, part: String, with_comments: bool) -> Result<Self> {
        let rels = relationships_of(package, &part)?;
        let find = |kind: &str| {
            rels.iter()
                .find(|rel| rel.is(kind))
                .map(|rel| Link::from_relationship(&part, rel))
        };
        let comments_link = find("comments");
        // Header/footer images use a second vmlDrawing relationship; notes hang off legacyDrawing
        let vml_link = match package.part(&part) {
            Some(xml) => legacy_drawing_id(xml)?,
            None => None,
        }
        .and_then(|rel_id| rels.iter().find(|rel| rel.id == rel_id && rel.is("vmlDrawing")))
        .map(|rel| Link::from_relationship(&part, rel));
        let threaded_links = rels
            .iter()
            .filter(|rel| rel.is("threadedComment"))
            .map(|rel| Link::from_relationship(&part, rel))
            .collect();

        let comments = match (&comments_link, with_comments) {
            (Some(link), true) => match package.part(&link.part) {
                Some(xml) => parse_sheet_comments(&name, &link.part, xml)?,
                None => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(Self {
            name,
            part,
            comments_link,
            vml_link,
            threaded_links,
            comments,
        })
    }
}

#[derive(Debug)]
pub(crate) struct Workbook {
    package: Package,
    sheets: Vec<Sheet>,
    /// Sheet indices whose comments the accessor exposes
    scope: Vec<usize>,
    deleted: BTreeMap<usize, HashSet<String>>,
}

impl Workbook {
    pub(crate) fn open(package: Package, sheet_scope: SheetScope) -> Result<Self> {
        let (entries, active_tab) = parse_workbook(package.require(WORKBOOK_PART)?)?;
        let rels = relationships_of(&package, WORKBOOK_PART)?;

        let active = active_tab.min(entries.len().saturating_sub(1));
        let scope: Vec<usize> = match sheet_scope {
            SheetScope::ActiveSheet if entries.is_empty() => Vec::new(),
            SheetScope::ActiveSheet => vec![active],
            SheetScope::Workbook => (0..entries.len()).collect(),
        };

        let mut sheets = Vec::with_capacity(entries.len());
        for (index, (name, rel_id)) in entries.into_iter().enumerate() {
            let rel = rels.iter().find(|rel| rel.id == rel_id).ok_or_else(|| {
                Error::malformed(
                    WORKBOOK_PART,
                    format!("sheet `{name}` points at missing relationship {rel_id}"),
                )
            })?;
            let part = resolve_target(WORKBOOK_PART, &rel.target);
            sheets.push(Sheet::load(&package, name, part, scope.contains(&index))?);
        }
        log::debug!(
            "xlsx package has {} sheet(s), active tab {active}, {} in scope",
            sheets.len(),
            scope.len()
        );

        Ok(Self {
            package,
            sheets,
            scope,
            deleted: BTreeMap::new(),
        })
    }

    fn is_deleted(&self, index: usize, cell: &str) -> bool {
        self.deleted
            .get(&index)
            .is_some_and(|cells| cells.contains(cell))
    }

    /// The package with every deleted comment removed; the loaded package is untouched
    pub(crate) fn render(&self) -> Result<Package> {
        let mut package = self.package.clone();

        for (&index, cells) in &self.deleted {
            let sheet = &self.sheets[index];
            let remaining = sheet.comments.len().saturating_sub(cells.len());
            let is_deleted_ref = |reference: &str| cells.contains(&canonical_ref(reference));
            log::debug!(
                "removing {} comment(s) from sheet `{}`, {remaining} left",
                cells.len(),
                sheet.name
            );

            if let Some(link) = &sheet.comments_link {
                if remaining == 0 {
                    detach_part(&mut package, &sheet.part, &link.rel_id, &link.part)?;
                } else if let Some(xml) = package.part(&link.part) {
                    let filtered = remove_elements(xml, |e| {
                        e.local_name().as_ref() == b"comment"
                            && attr(e, b"ref").is_some_and(|r| is_deleted_ref(&r))
                    })?;
                    package.set_part(&link.part, filtered);
                }
            }

            if let Some(link) = &sheet.vml_link {
                if let Some(xml) = package.part(&link.part) {
                    let filtered = remove_containers(xml, b"v:shape", |events| {
                        note_anchor(events)
                            .is_some_and(|(row, column)| cells.contains(&cell_ref(row, column)))
                    })?;

                    if count_elements(&filtered, b"shape")? == 0 {
                        detach_part(&mut package, &sheet.part, &link.rel_id, &link.part)?;
                        let sheet_xml = package.require(&sheet.part)?;
                        let stripped = remove_elements(sheet_xml, |e| {
                            e.local_name().as_ref() == b"legacyDrawing"
                                && attr_local(e, b"id").as_deref() == Some(link.rel_id.as_str())
                        })?;
                        package.set_part(&sheet.part, stripped);
                    } else {
                        package.set_part(&link.part, filtered);
                    }
                }
            }

            for link in &sheet.threaded_links {
                let Some(xml) = package.part(&link.part) else {
                    continue;
                };
                let filtered = remove_elements(xml, |e| {
                    e.local_name().as_ref() == b"threadedComment"
                        && attr(e, b"ref").is_some_and(|r| is_deleted_ref(&r))
                })?;

                if count_elements(&filtered, b"threadedComment")? == 0 {
                    detach_part(&mut package, &sheet.part, &link.rel_id, &link.part)?;
                } else {
                    package.set_part(&link.part, filtered);
                }
            }
        }

        Ok(package)
    }
}

impl CommentTarget for Workbook {
    fn comments(&self) -> Result<Vec<Comment>> {
        Ok(self
            .scope
            .iter()
            .flat_map(|&index| {
                self.sheets[index]
                    .comments
                    .iter()
                    .filter(move |c| !self.is_deleted(index, &c.cell))
                    .map(|c| c.comment.clone())
            })
            .collect())
    }

    fn delete_comment(&mut self, id: &CommentId) -> Result<()> {
        let found = self.scope.iter().find_map(|&index| {
            self.sheets[index]
                .comments
                .iter()
                .find(|c| &c.comment.id == id)
                .map(|c| (index, c.cell.clone()))
        });

        let Some((index, cell)) = found else {
            return Err(Error::Delete {
                id: id.to_string(),
                reason: "no such comment on the sheet".to_string(),
            });
        };

        if !self.deleted.entry(index).or_default().insert(cell) {
            return Err(Error::Delete {
                id: id.to_string(),
                reason: "comment was already deleted".to_string(),
            });
        }
        Ok(())
    }
}

/// Relationship id of the sheet's `legacyDrawing`, the VML drawing holding its note shapes
fn legacy_drawing_id(xml: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(None),
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"legacyDrawing" => {
                return Ok(attr_local(e, b"id"));
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Sheet (name, relationship id) pairs in tab order, plus the active tab
fn parse_workbook(xml: &[u8]) -> Result<(Vec<(String, String)>, usize)> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut active_tab = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = attr(e, b"name").unwrap_or_default();
                    let rel_id = attr_local(e, b"id").ok_or_else(|| {
                        Error::malformed(WORKBOOK_PART, format!("sheet `{name}` has no r:id"))
                    })?;
                    sheets.push((name, rel_id));
                }
                b"workbookView" if active_tab.is_none() => {
                    active_tab = Some(
                        attr(e, b"activeTab")
                            .and_then(|tab| tab.parse::<usize>().ok())
                            .unwrap_or(0),
                    );
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab.unwrap_or(0)))
}

fn parse_sheet_comments(sheet_name: &str, part_name: &str, xml: &[u8]) -> Result<Vec<SheetComment>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut authors: Vec<String> = Vec::new();
    let mut comments = Vec::new();
    let mut current: Option<(String, Option<usize>, String)> = None;
    let mut in_author = false;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = true;
                    authors.push(String::new());
                }
                b"comment" => {
                    let reference = attr(e, b"ref")
                        .ok_or_else(|| Error::malformed(part_name, "comment without ref"))?;
                    let author_id = attr(e, b"authorId").and_then(|id| id.parse().ok());
                    current = Some((canonical_ref(&reference), author_id, String::new()));
                }
                b"rPh" => in_phonetic = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"author" => in_author = false,
                b"comment" => {
                    if let Some((cell, author_id, text)) = current.take() {
                        let anchor = format!("{sheet_name}!{cell}");
                        let author = author_id.and_then(|id| authors.get(id).cloned());
                        comments.push(SheetComment {
                            comment: Comment::new(anchor.clone(), text.trim())
                                .with_author(author)
                                .with_anchor(anchor),
                            cell,
                        });
                    }
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref e) if in_author => {
                if let Some(author) = authors.last_mut() {
                    author.push_str(&e.unescape()?);
                }
            }
            Event::Text(ref e) if in_text && !in_phonetic => {
                if let Some((_, _, text)) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

/// Cell of a VML note shape (`x:ClientData ObjectType="Note"`), if the events describe one
fn note_anchor(events: &[Event<'static>]) -> Option<(u32, u32)> {
    #[derive(Clone, Copy)]
    enum Field {
        Row,
        Column,
    }

    let mut is_note = false;
    let mut field = None;
    let mut row = None;
    let mut column = None;

    for event in events {
        match event {
            Event::Start(e) | Event::Empty(e) => {
                field = None;
                match e.local_name().as_ref() {
                    b"ClientData" => {
                        is_note = attr_local(e, b"ObjectType").as_deref() == Some("Note");
                    }
                    b"Row" => field = Some(Field::Row),
                    b"Column" => field = Some(Field::Column),
                    _ => {}
                }
            }
            Event::Text(text) => {
                let value = text.unescape().ok().and_then(|t| t.trim().parse::<u32>().ok());
                match field {
                    Some(Field::Row) => row = value.or(row),
                    Some(Field::Column) => column = value.or(column),
                    None => {}
                }
            }
            Event::End(_) => field = None,
            _ => {}
        }
    }

    if is_note { Some((row?, column?)) } else { None }
}
