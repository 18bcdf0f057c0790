//! Normalization of parsed metadata before comparing it.

use serde_json::Value;

use crate::xml::CDATA;

/// Replace text-only elements with their text, and drop text from elements
/// that also carry attributes or children.
///
/// `{".cdata": "x"}` becomes `"x"` and `{"a": "1", ".cdata": "x"}` becomes
/// `{"a": "1"}`.
pub fn collapse_text(value: &mut Value) {
  let mut stack = vec![value];

  while let Some(node) = stack.pop() {
    let text = match node {
      Value::Object(map) if map.len() == 1 => map.remove(CDATA),
      _ => None,
    };
    if let Some(text) = text {
      *node = text;
      continue;
    }

    match node {
      Value::Object(map) => {
        map.remove(CDATA);
        stack.extend(map.values_mut());
      }
      Value::Array(items) => stack.extend(items.iter_mut()),
      _ => {}
    }
  }
}

/// Sort the records at a dotted `path` by the value of their `key` field.
///
/// A single record (an object, as produced for an element that occurs
/// once) is first wrapped into a one-element array. Records are ordered by
/// the string form of `key`; records without it sort first. Returns `false`
/// when `path` does not lead to a value.
pub fn sort_by_key(value: &mut Value, path: &str, key: &str) -> bool {
  let mut target = value;
  for segment in path.split('.').filter(|s| !s.is_empty()) {
    match target.get_mut(segment) {
      Some(next) => target = next,
      None => return false,
    }
  }

  if target.is_object() {
    let single = target.take();
    *target = Value::Array(vec![single]);
  }

  if let Value::Array(records) = target {
    records.sort_by_cached_key(|record| record.get(key).map(sort_text));
  }
  true
}

fn sort_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_collapse_text() {
    let mut doc = json!({
      "updates": {
        "update": [
          { "id": { ".cdata": "E1" }, "title": { ".cdata": "t1" } },
          { "from": "errata@example.com", ".cdata": "dropped", "id": { ".cdata": "E2" } }
        ]
      }
    });
    collapse_text(&mut doc);
    assert_eq!(
      doc,
      json!({
        "updates": {
          "update": [
            { "id": "E1", "title": "t1" },
            { "from": "errata@example.com", "id": "E2" }
          ]
        }
      })
    );
  }

  #[test]
  fn test_collapse_text_root() {
    let mut doc = json!({ ".cdata": "x" });
    collapse_text(&mut doc);
    assert_eq!(doc, json!("x"));
  }

  #[test]
  fn test_sort_by_key() {
    let mut doc = json!({
      "pkgs": { "pkg": [{ "name": "wolf" }, { "version": "1" }, { "name": "bear" }] }
    });
    assert!(sort_by_key(&mut doc, "pkgs.pkg", "name"));
    assert_eq!(
      doc,
      json!({
        "pkgs": { "pkg": [{ "version": "1" }, { "name": "bear" }, { "name": "wolf" }] }
      })
    );
  }

  #[test]
  fn test_sort_by_key_wraps_single_record() {
    let mut doc = json!({ "pkgs": { "pkg": { "name": "bear" } } });
    assert!(sort_by_key(&mut doc, "pkgs.pkg", "name"));
    assert_eq!(doc, json!({ "pkgs": { "pkg": [{ "name": "bear" }] } }));
  }

  #[test]
  fn test_sort_by_key_numbers_use_string_form() {
    let mut doc = json!([{ "n": 10 }, { "n": 9 }, { "n": "1" }]);
    assert!(sort_by_key(&mut doc, "", "n"));
    assert_eq!(doc, json!([{ "n": "1" }, { "n": 10 }, { "n": 9 }]));
  }

  #[test]
  fn test_sort_by_key_missing_path() {
    let mut doc = json!({ "pkgs": {} });
    let before = doc.clone();
    assert!(!sort_by_key(&mut doc, "pkgs.pkg", "name"));
    assert_eq!(doc, before);
  }
}
