//! XML flattening.
//!
//! Each document is walked element by element in document order (root included):
//!
//! - an element with attributes appends every attribute value to the list stored under the
//!   attribute name, shared across the whole document (repeated `<part name=".." quantity=".."/>`
//!   elements build the `name` and `quantity` lists);
//! - otherwise, an element whose text (the text before its first child) is non-blank stores
//!   that text under its tag name;
//! - anything else is skipped.
//!
//! Entities declared in an internal `<!DOCTYPE>` subset are expanded as plain text in element
//! text and attribute values. External entities are never fetched.
//!
//! Documents that are not well-formed are set aside as [`RejectedDocument`]s; they never fail
//! the batch.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, RawDocument, Record, Value};

/// What to do when a text-bearing tag occurs more than once in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatedTextPolicy {
    /// Keep the last text seen (earlier values are dropped).
    #[default]
    LastWins,
    /// Collect every text into a list.
    Accumulate,
}

/// Options for [`extract_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub repeated_text: RepeatedTextPolicy,
}

/// A document that could not be parsed, with the reason.
#[derive(Debug)]
pub struct RejectedDocument {
    pub document: RawDocument,
    /// Always [`PipelineError::MalformedDocument`].
    pub error: PipelineError,
}

/// Result of flattening a batch of documents.
#[derive(Debug)]
pub struct Extraction {
    /// One row per successfully parsed document, in input order.
    pub dataset: DataSet,
    /// Documents that were excluded, in input order.
    pub rejected: Vec<RejectedDocument>,
}

/// Flatten a single XML document into a [`Record`].
///
/// # Errors
///
/// [`PipelineError::MalformedDocument`] if `text` is not a well-formed document.
pub fn flatten_document(text: &str, policy: RepeatedTextPolicy) -> PipelineResult<Record> {
    flatten(text, policy).map_err(|message| PipelineError::MalformedDocument {
        document: "<inline document>".to_string(),
        message,
    })
}

/// Flatten every document and stack the good ones into a [`DataSet`].
pub fn extract_records(documents: &[RawDocument], options: &ExtractOptions) -> Extraction {
    tracing::info!(documents = documents.len(), "beginning to parse documents");

    let mut records = Vec::with_capacity(documents.len());
    let mut rejected = Vec::new();
    for doc in documents {
        match flatten(&doc.text, options.repeated_text) {
            Ok(record) => records.push(record),
            Err(message) => {
                let error = PipelineError::MalformedDocument {
                    document: doc.to_string(),
                    message,
                };
                rejected.push(RejectedDocument {
                    document: doc.clone(),
                    error,
                });
            }
        }
    }

    if !rejected.is_empty() {
        tracing::warn!(
            count = rejected.len(),
            "found document(s) with incorrect structure, please remediate"
        );
        for r in &rejected {
            tracing::warn!(document = %r.document, "{}", r.error);
        }
    }

    let dataset = DataSet::from_records(&records);
    tracing::info!(rows = dataset.row_count(), columns = dataset.schema.fields.len(), "parsed all documents");

    Extraction { dataset, rejected }
}

// Internal DOCTYPE entities, name to replacement text.
type Entities = HashMap<String, String>;

struct Frame {
    tag: String,
    has_attributes: bool,
    text: String,
    // Set once a child element starts; later text belongs to the child's tail.
    text_done: bool,
}

fn flatten(text: &str, policy: RepeatedTextPolicy) -> Result<Record, String> {
    let mut reader = Reader::from_str(text);
    let mut record = Record::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut roots = 0usize;
    let mut entities = Entities::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} (at byte {})", reader.buffer_position()))?;
        match event {
            Event::Start(start) => open(&mut stack, &mut record, &start, &mut roots, &entities, policy)?,
            Event::Empty(start) => {
                open(&mut stack, &mut record, &start, &mut roots, &entities, policy)?;
                close(&mut stack, &mut record, policy)?;
            }
            Event::End(_) => close(&mut stack, &mut record, policy)?,
            Event::Text(t) => push_text(&mut stack, utf8(&t)?)?,
            Event::CData(c) => push_text(&mut stack, utf8(&c)?)?,
            Event::GeneralRef(r) => push_text(&mut stack, &resolve_reference(utf8(&r)?, &entities)?)?,
            Event::DocType(d) => declare_entities(utf8(&d)?, &mut entities)?,
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        return Err(format!("unclosed element <{}>", frame.tag));
    }
    if roots == 0 {
        return Err("no element found".to_string());
    }
    Ok(record)
}

fn open(
    stack: &mut Vec<Frame>,
    record: &mut Record,
    start: &BytesStart<'_>,
    roots: &mut usize,
    entities: &Entities,
    policy: RepeatedTextPolicy,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            if !parent.text_done {
                parent.text_done = true;
                assign_text(record, parent, policy);
            }
        }
        None => {
            *roots += 1;
            if *roots > 1 {
                return Err("junk after document element".to_string());
            }
        }
    }

    let tag = utf8(start.name().as_ref())?.to_string();
    let mut has_attributes = false;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute on <{tag}>: {e}"))?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value_with(|name| {
                resolve_predefined_entity(name).or_else(|| entities.get(name).map(String::as_str))
            })
            .map_err(|e| format!("bad attribute '{key}' on <{tag}>: {e}"))?;
        record.push(&key, value.into_owned());
        has_attributes = true;
    }

    stack.push(Frame {
        tag,
        has_attributes,
        text: String::new(),
        text_done: false,
    });
    Ok(())
}

fn close(stack: &mut Vec<Frame>, record: &mut Record, policy: RepeatedTextPolicy) -> Result<(), String> {
    let frame = stack.pop().ok_or_else(|| "closing tag without a matching opening tag".to_string())?;
    if !frame.text_done {
        assign_text(record, &frame, policy);
    }
    Ok(())
}

fn assign_text(record: &mut Record, frame: &Frame, policy: RepeatedTextPolicy) {
    if frame.has_attributes || frame.text.trim().is_empty() {
        return;
    }
    match policy {
        RepeatedTextPolicy::Accumulate if record.get(&frame.tag).is_some() => {
            record.push(&frame.tag, frame.text.clone())
        }
        _ => record.set(&frame.tag, Value::Utf8(frame.text.clone())),
    }
}

fn push_text(stack: &mut [Frame], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(frame) => {
            if !frame.text_done {
                frame.text.push_str(text);
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside of the document element".to_string()),
    }
}

fn resolve_reference(name: &str, entities: &Entities) -> Result<String, String> {
    if let Some(text) = entities.get(name) {
        return Ok(text.clone());
    }
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(char_reference),
    };
    resolved
        .map(String::from)
        .ok_or_else(|| format!("undefined entity '&{name};'"))
}

// Collects `<!ENTITY name "text">` declarations from a DOCTYPE body. The first declaration of
// a name wins. Parameter entities (`<!ENTITY % ..>`) and external ones (`SYSTEM`/`PUBLIC`)
// are not recorded, so references to them stay undefined.
fn declare_entities(doctype: &str, entities: &mut Entities) -> Result<(), String> {
    let mut rest = doctype;
    while let Some(pos) = rest.find("<!ENTITY") {
        rest = rest[pos + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace())
            .ok_or_else(|| "unterminated entity declaration".to_string())?;
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let close = rest[1..]
            .find(quote)
            .ok_or_else(|| format!("unterminated value for entity '{name}'"))?;
        let value = expand_references(&rest[1..1 + close], entities)?;
        rest = &rest[close + 2..];

        entities.entry(name.to_string()).or_insert(value);
    }
    Ok(())
}

// Replaces `&name;` references inside an entity value using what is declared so far.
fn expand_references(value: &str, entities: &Entities) -> Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let end = rest[amp..]
            .find(';')
            .ok_or_else(|| format!("unterminated reference in '{value}'"))?;
        out.push_str(&resolve_reference(&rest[amp + 1..amp + end], entities)?);
        rest = &rest[amp + end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn char_reference(num: &str) -> Option<char> {
    let code = match num.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => num.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

fn utf8(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|e| format!("invalid utf-8: {e}"))
}
