// types.xml reader/writer.
// Reader is a quick-xml pull parser that only understands the catalogue shape:
// <types> → <type name> → scalar elements, <flags>, <category|usage|value name>.
// Unknown children of <type> are carried through as `ExtraElement` trees and
// written back after the known part they followed.
use std::fmt::{self, Write as _};

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Anchor, ExtraElement, Flag, Record, ScalarField};
use crate::store::Catalogue;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const ROOT_TAG: &str = "types";
pub const RECORD_TAG: &str = "type";

const INDENT: &str = "    ";

fn malformed(msg: impl fmt::Display) -> Error {
    Error::MalformedDocument(msg.to_string())
}

pub fn parse_catalogue_bytes(data: &[u8]) -> Result<Catalogue> {
    let text = std::str::from_utf8(data).map_err(|e| malformed(format!("not UTF-8: {e}")))?;
    parse_catalogue(text.strip_prefix('\u{feff}').unwrap_or(text))
}

// Record under construction plus its collections in document order.
// `extra` is the stack of open unknown elements; the first one sits at level 3.
#[derive(Default)]
struct Pending {
    record: Option<Record>,
    field: Option<ScalarField>,
    anchor: Anchor,
    extra: Vec<ExtraElement>,
    categories: Vec<String>,
    usages: Vec<String>,
    values: Vec<String>,
}

impl Pending {
    fn start(&mut self, record: Record) {
        self.record = Some(record);
        self.anchor = Anchor::Start;
    }

    fn finish(&mut self) -> Option<Record> {
        let mut r = self.record.take()?;
        r.replace_categories(self.categories.drain(..));
        r.replace_usages(self.usages.drain(..));
        r.replace_values(self.values.drain(..));
        self.field = None;
        self.extra.clear();
        Some(r)
    }

    // `level` is where the innermost open unknown element sits.
    fn in_extra(&self, level: usize) -> bool {
        !self.extra.is_empty() && self.extra.len() + 2 == level
    }

    fn attach(&mut self, el: ExtraElement) {
        if let Some(parent) = self.extra.last_mut() {
            parent.children.push(el);
        } else if let Some(record) = self.record.as_mut() {
            record.push_extra(el);
        }
    }
}

pub fn parse_catalogue(text: &str) -> Result<Catalogue> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut store = Catalogue::new();
    let mut pending = Pending::default();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let ev = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                return Err(malformed(format!(
                    "{e} at byte {}",
                    reader.buffer_position()
                )));
            }
        };
        match ev {
            Event::Decl(decl) => match decl.encoding() {
                Some(Ok(enc)) if !enc.eq_ignore_ascii_case(b"utf-8") => {
                    return Err(malformed(format!(
                        "unsupported encoding {}",
                        String::from_utf8_lossy(&enc)
                    )));
                }
                Some(Err(e)) => return Err(malformed(e)),
                _ => {}
            },
            Event::Start(e) => {
                depth += 1;
                open_element(&e, depth, false, &mut seen_root, &mut pending, &mut store)?;
            }
            Event::Empty(e) => {
                open_element(&e, depth + 1, true, &mut seen_root, &mut pending, &mut store)?;
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(malformed("closing tag without an open element"));
                }
                close_element(depth, &mut pending, &mut store);
                depth -= 1;
            }
            Event::Text(t) => {
                let s = t.unescape().map_err(malformed)?;
                push_text(depth, &s, &mut pending)?;
            }
            Event::CData(c) => {
                let s = String::from_utf8_lossy(&c).into_owned();
                push_text(depth, &s, &mut pending)?;
            }
            Event::Eof => break,
            // comments, processing instructions, doctype
            _ => {}
        }
    }

    if depth != 0 {
        return Err(malformed("unexpected end of document: unclosed element"));
    }
    if !seen_root {
        return Err(malformed("no root element"));
    }
    Ok(store)
}

fn open_element(
    e: &BytesStart<'_>,
    level: usize,
    empty: bool,
    seen_root: &mut bool,
    pending: &mut Pending,
    store: &mut Catalogue,
) -> Result<()> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    match level {
        1 => {
            if *seen_root {
                return Err(malformed("multiple root elements"));
            }
            *seen_root = true;
            if tag != ROOT_TAG {
                return Err(malformed(format!(
                    "root element is <{tag}>, expected <{ROOT_TAG}>"
                )));
            }
        }
        2 if tag == RECORD_TAG => {
            let name = attribute(e, "name")?
                .ok_or_else(|| malformed("<type> element without a name attribute"))?;
            pending.start(Record::new(name));
            if empty {
                close_element(level, pending, store);
            }
        }
        2 => debug!(element = %tag, "skipping non-type element"),
        3 => {
            let Some(record) = pending.record.as_mut() else {
                return Ok(());
            };
            if let Some(field) = ScalarField::from_tag(&tag) {
                record.set_scalar(field, "");
                pending.anchor = Anchor::Scalar(field);
                if !empty {
                    pending.field = Some(field);
                }
                return Ok(());
            }
            match tag.as_str() {
                "flags" => {
                    for (k, v) in attributes(e)? {
                        match Flag::from_name(&k) {
                            Some(flag) => record.set_flag(flag, v),
                            None => debug!(attribute = %k, "ignoring unknown flag"),
                        }
                    }
                    pending.anchor = Anchor::Flags;
                }
                "category" | "usage" | "value" => {
                    let name = attribute(e, "name")?.unwrap_or_default();
                    let (names, anchor) = match tag.as_str() {
                        "category" => (&mut pending.categories, Anchor::Category),
                        "usage" => (&mut pending.usages, Anchor::Usage),
                        _ => (&mut pending.values, Anchor::Value),
                    };
                    names.push(name);
                    pending.anchor = anchor;
                }
                _ => open_extra(e, tag.clone(), empty, pending)?,
            }
        }
        // below an unknown element; anything nested in a known one is ignored
        _ if pending.in_extra(level - 1) => open_extra(e, tag, empty, pending)?,
        _ => {}
    }
    Ok(())
}

fn open_extra(e: &BytesStart<'_>, tag: String, empty: bool, pending: &mut Pending) -> Result<()> {
    let el = ExtraElement {
        tag,
        attributes: attributes(e)?,
        after: pending.anchor,
        ..ExtraElement::default()
    };
    if empty {
        pending.attach(el);
    } else {
        pending.extra.push(el);
    }
    Ok(())
}

fn close_element(level: usize, pending: &mut Pending, store: &mut Catalogue) {
    match level {
        2 => {
            if let Some(record) = pending.finish() {
                let name = record.name().to_string();
                if !store.insert(record) {
                    tracing::warn!(name = %name, "duplicate type name, keeping the first one");
                }
            }
        }
        _ if pending.in_extra(level) => {
            if let Some(el) = pending.extra.pop() {
                pending.attach(el);
            }
        }
        3 => pending.field = None,
        _ => {}
    }
}

fn push_text(depth: usize, s: &str, pending: &mut Pending) -> Result<()> {
    if depth == 0 {
        return Err(malformed("text outside of the root element"));
    }
    if pending.in_extra(depth) {
        if let Some(el) = pending.extra.last_mut() {
            el.text.push_str(s);
        }
    } else if depth == 3 {
        if let (Some(field), Some(record)) = (pending.field, pending.record.as_mut()) {
            let mut cur = record.scalar(field).to_string();
            cur.push_str(s);
            record.set_scalar(field, cur);
        }
    }
    Ok(())
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    Ok(attributes(e)?.into_iter().find(|(k, _)| k == key).map(|(_, v)| v))
}

/// Serialize the whole catalogue. Collection elements are rebuilt from the
/// model every time, never diffed against a previous document.
pub fn write_catalogue(store: &Catalogue) -> String {
    let mut out = String::new();
    write_document(store, &mut out).ok();
    out
}

fn write_document(store: &Catalogue, out: &mut String) -> fmt::Result {
    writeln!(out, "{XML_DECLARATION}")?;
    writeln!(out, "<{ROOT_TAG}>")?;
    for record in store.records() {
        write_record(record, out)?;
    }
    writeln!(out, "</{ROOT_TAG}>")
}

fn write_record(r: &Record, out: &mut String) -> fmt::Result {
    let pad = INDENT.repeat(2);
    writeln!(out, "{INDENT}<{RECORD_TAG} name=\"{}\">", escape(r.name()))?;
    write_extras(r, Anchor::Start, out)?;
    for field in ScalarField::ALL {
        let tag = field.tag();
        writeln!(out, "{pad}<{tag}>{}</{tag}>", escape(r.scalar(field)))?;
        write_extras(r, Anchor::Scalar(field), out)?;
    }
    write!(out, "{pad}<flags")?;
    for flag in Flag::ALL {
        write!(out, " {}=\"{}\"", flag.name(), escape(r.flag(flag)))?;
    }
    writeln!(out, "/>")?;
    write_extras(r, Anchor::Flags, out)?;
    for (tag, names, anchor) in [
        ("category", r.categories(), Anchor::Category),
        ("usage", r.usages(), Anchor::Usage),
        ("value", r.values(), Anchor::Value),
    ] {
        for name in names {
            writeln!(out, "{pad}<{tag} name=\"{}\"/>", escape(name))?;
        }
        write_extras(r, anchor, out)?;
    }
    writeln!(out, "{INDENT}</{RECORD_TAG}>")
}

fn write_extras(r: &Record, anchor: Anchor, out: &mut String) -> fmt::Result {
    for el in r.extra().iter().filter(|el| el.after == anchor) {
        write_extra(el, 2, out)?;
    }
    Ok(())
}

fn write_extra(el: &ExtraElement, level: usize, out: &mut String) -> fmt::Result {
    let pad = INDENT.repeat(level);
    write!(out, "{pad}<{}", el.tag)?;
    for (k, v) in &el.attributes {
        write!(out, " {k}=\"{}\"", escape(v))?;
    }
    if el.children.is_empty() {
        if el.text.is_empty() {
            return writeln!(out, "/>");
        }
        return writeln!(out, ">{}</{}>", escape(&el.text), el.tag);
    }
    writeln!(out, ">{}", escape(&el.text))?;
    for child in &el.children {
        write_extra(child, level + 1, out)?;
    }
    writeln!(out, "{pad}</{}>", el.tag)
}
