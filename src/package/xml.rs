//! Streaming XML filters
//!
//! Each filter reads a part with quick-xml and writes every event it keeps
//! back unchanged, so markup outside the removed elements is not reformatted.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::Result;

fn reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    let config = reader.config_mut();
    config.trim_text(false);
    // VML drawings from older producers are not always strictly nested
    config.check_end_names = false;
    reader
}

/// Unescaped value of the attribute with exactly this qualified name
pub(crate) fn attr(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Like [`attr`] but matches on the local name, whatever the prefix
pub(crate) fn attr_local(element: &BytesStart, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Drops every element (with its subtree) for which `matches` returns true
pub(crate) fn remove_elements<F>(xml: &[u8], mut matches: F) -> Result<Vec<u8>>
where
    F: FnMut(&BytesStart) -> bool,
{
    let mut reader = reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(_) if skip_depth > 0 => skip_depth += 1,
            Event::End(_) if skip_depth > 0 => skip_depth -= 1,
            _ if skip_depth > 0 => {}
            Event::Start(ref e) if matches(e) => skip_depth = 1,
            Event::Empty(ref e) if matches(e) => {}
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Drops `container` elements whose complete event list satisfies `matches`
///
/// The container's events (start tag through end tag) are buffered so the
/// predicate can look at descendants and text before deciding.
pub(crate) fn remove_containers<F>(xml: &[u8], container: &[u8], mut matches: F) -> Result<Vec<u8>>
where
    F: FnMut(&[Event<'static>]) -> bool,
{
    let mut reader = reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut held: Vec<Event<'static>> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            event if depth > 0 => {
                match &event {
                    Event::Start(_) => depth += 1,
                    Event::End(_) => depth -= 1,
                    _ => {}
                }
                held.push(event.into_owned());

                if depth == 0 {
                    if matches(&held) {
                        held.clear();
                    } else {
                        for kept in held.drain(..) {
                            writer.write_event(kept)?;
                        }
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == container => {
                depth = 1;
                held.push(Event::Start(e.into_owned()));
            }
            Event::Empty(e) if e.name().as_ref() == container => {
                let single = Event::Empty(e.into_owned());
                if !matches(std::slice::from_ref(&single)) {
                    writer.write_event(single)?;
                }
            }
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    // Unterminated container at EOF: keep what was read
    for kept in held {
        writer.write_event(kept)?;
    }

    Ok(writer.into_inner())
}

/// Number of elements with this local name
pub(crate) fn count_elements(xml: &[u8], local: &[u8]) -> Result<usize> {
    let mut reader = reader(xml);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == local => {
                count += 1
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(count)
}
