//! Loading XML documents as JSON-like trees.
//!
//! An element becomes an object:
//!
//! - each attribute is a string field;
//! - character data (text and CDATA) is stored under [`CDATA`], trimmed and
//!   with the first line's indentation removed from every line;
//! - each child element is a field named after it, and children sharing a
//!   name are collected into an array in document order.
//!
//! The document itself is an object with the root element as its only
//! field. Comments, processing instructions and the declaration are
//! ignored.
//!
//! ```
//! use pulp_smash_diff::xml;
//! use serde_json::json;
//!
//! let doc = xml::parse_str(r#"<updates><update id="E1">fix</update><update id="E2"/></updates>"#)?;
//! assert_eq!(doc, json!({
//!   "updates": { "update": [{ "id": "E1", ".cdata": "fix" }, { "id": "E2" }] }
//! }));
//! # Ok::<(), pulp_smash_diff::XmlError>(())
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::XmlError;

/// Field holding an element's character data.
pub const CDATA: &str = ".cdata";

/// An element whose end tag has not been seen yet.
struct Open {
  name: String,
  fields: Map<String, Value>,
  text: String,
}

impl Open {
  fn start(tag: &BytesStart<'_>) -> Result<Self, XmlError> {
    let name = std::str::from_utf8(tag.name().as_ref())?.to_string();
    let mut fields = Map::new();
    for attr in tag.attributes() {
      let attr = attr?;
      let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
      let value = attr.unescape_value()?.into_owned();
      fields.insert(key, Value::String(value));
    }
    Ok(Self {
      name,
      fields,
      text: String::new(),
    })
  }

  fn close(mut self) -> (String, Value) {
    let text = dedent(&self.text);
    if !text.is_empty() {
      self.fields.insert(CDATA.to_string(), Value::String(text));
    }
    (self.name, Value::Object(self.fields))
  }

  fn add_child(&mut self, name: String, child: Value) {
    match self.fields.get_mut(&name) {
      Some(Value::Array(siblings)) => siblings.push(child),
      Some(existing) => {
        let first = existing.take();
        *existing = Value::Array(vec![first, child]);
      }
      None => {
        self.fields.insert(name, child);
      }
    }
  }
}

/// Trim `raw` and strip the indentation of its first line from every line.
fn dedent(raw: &str) -> String {
  let leading = &raw[..raw.len() - raw.trim_start().len()];
  let indent = leading.rsplit('\n').next().unwrap_or_default();

  raw
    .trim()
    .lines()
    .map(|line| line.strip_prefix(indent).unwrap_or(line))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Parse an XML document from any buffered reader.
pub fn parse_reader<R: BufRead>(input: R) -> Result<Value, XmlError> {
  let mut reader = Reader::from_reader(input);
  reader.config_mut().trim_text(false);

  let mut buf = Vec::new();
  let mut open: Vec<Open> = Vec::new();
  let mut root: Option<(String, Value)> = None;

  loop {
    match reader.read_event_into(&mut buf)? {
      Event::Start(tag) => open.push(Open::start(&tag)?),
      Event::Empty(tag) => {
        let (name, value) = Open::start(&tag)?.close();
        attach(&mut open, &mut root, name, value);
      }
      Event::End(_) => {
        if let Some(element) = open.pop() {
          let (name, value) = element.close();
          attach(&mut open, &mut root, name, value);
        }
      }
      Event::Text(text) => {
        if let Some(element) = open.last_mut() {
          element.text.push_str(&text.unescape()?);
        }
      }
      Event::CData(data) => {
        if let Some(element) = open.last_mut() {
          element.text.push_str(std::str::from_utf8(&data.into_inner())?);
        }
      }
      Event::Eof => break,
      _ => {}
    }
    buf.clear();
  }

  let (name, value) = root.ok_or(XmlError::Empty)?;
  let mut document = Map::new();
  document.insert(name, value);
  Ok(Value::Object(document))
}

fn attach(open: &mut [Open], root: &mut Option<(String, Value)>, name: String, value: Value) {
  match open.last_mut() {
    Some(parent) => parent.add_child(name, value),
    None => *root = Some((name, value)),
  }
}

/// Parse an XML document held in memory.
pub fn parse_str(input: &str) -> Result<Value, XmlError> {
  parse_reader(input.as_bytes())
}

/// Parse a gzip-compressed XML document.
pub fn parse_gzip<R: Read>(input: R) -> Result<Value, XmlError> {
  parse_reader(BufReader::new(GzDecoder::new(input)))
}

/// Parse an XML file, decompressing it first if its name ends in `.gz`.
pub fn parse_file(path: &Path) -> Result<Value, XmlError> {
  let file = File::open(path)?;
  let gzipped = path.extension().is_some_and(|ext| ext == "gz");
  debug!(path = %path.display(), gzipped, "xml_loading");

  if gzipped {
    parse_gzip(file)
  } else {
    parse_reader(BufReader::new(file))
  }
}
