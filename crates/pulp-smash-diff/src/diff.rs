//! Structural diff of two JSON-like trees.
//!
//! The walk is driven by an explicit work-list rather than recursion, and
//! never falls back on `Value`'s own equality, which recurses. Every shared
//! key and list position is queued. Output nodes live in an arena and are
//! assembled into a [`Value`] at the end, children before parents, with the
//! nodes that recorded nothing dropped.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

/// Names for the two sides of a comparison.
///
/// They appear in the output as `MISSING_IN_<label>` and `TYPE_<label>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
  a: String,
  b: String,
}

impl Labels {
  /// Empty labels fall back to `"1"` and `"2"`.
  pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
    let (a, b) = (a.into(), b.into());
    Self {
      a: if a.is_empty() { "1".to_string() } else { a },
      b: if b.is_empty() { "2".to_string() } else { b },
    }
  }

  pub fn a(&self) -> &str {
    &self.a
  }

  pub fn b(&self) -> &str {
    &self.b
  }

  /// The same labels, sides swapped.
  pub fn swapped(&self) -> Self {
    Self {
      a: self.b.clone(),
      b: self.a.clone(),
    }
  }

  fn missing_in_a(&self) -> String {
    format!("MISSING_IN_{}", self.a)
  }

  fn missing_in_b(&self) -> String {
    format!("MISSING_IN_{}", self.b)
  }

  fn type_a(&self) -> String {
    format!("TYPE_{}", self.a)
  }

  fn type_b(&self) -> String {
    format!("TYPE_{}", self.b)
  }
}

impl Default for Labels {
  fn default() -> Self {
    Self::new("", "")
  }
}

/// Fields to echo into the output next to any difference found at a path.
///
/// A path is the dotted list of map keys leading to a node, with `""` for
/// the root. List indices do not extend the path, so `"updates.update"`
/// names both the list under `update` and each of its elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredFields {
  fields: BTreeMap<String, String>,
}

impl RequiredFields {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, path: impl Into<String>, field: impl Into<String>) -> Self {
    self.fields.insert(path.into(), field.into());
    self
  }

  pub fn get(&self, path: &str) -> Option<&str> {
    self.fields.get(path).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  /// The path of `key` under `path`, if some field is registered at or
  /// below it.
  fn below(&self, path: &str, key: &str) -> Option<String> {
    let child = if path.is_empty() {
      key.to_string()
    } else {
      format!("{}.{}", path, key)
    };
    self
      .fields
      .keys()
      .any(|known| {
        known == &child
          || known
            .strip_prefix(child.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
      })
      .then_some(child)
  }
}

impl<P: Into<String>, F: Into<String>> FromIterator<(P, F)> for RequiredFields {
  fn from_iter<I: IntoIterator<Item = (P, F)>>(iter: I) -> Self {
    iter
      .into_iter()
      .fold(Self::new(), |fields, (path, field)| fields.with(path, field))
  }
}

/// The kind of a value, as written in type-mismatch leaves.
pub fn kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Describe every difference between `a` and `b`.
///
/// Returns `{}` when the trees are equal. Otherwise the result mirrors the
/// inputs down to each difference:
///
/// - unequal scalars: `{"MISSING_IN_<A>": b, "MISSING_IN_<B>": a}`
/// - different kinds: `{"TYPE_<A>": kind_of_a, "TYPE_<B>": kind_of_b}`
/// - a key or list element present on one side only:
///   `{"MISSING_IN_<other side>": value}`
///
/// Equal list elements are left out, so positions in an output list do not
/// correspond to input positions. Use [`RequiredFields`] to keep records
/// identifiable.
pub fn diff(a: &Value, b: &Value, labels: &Labels, required: &RequiredFields) -> Value {
  let mut differ = Differ {
    labels,
    required,
    nodes: Vec::new(),
    work: Vec::new(),
  };
  let root = differ.alloc();
  let path = (!required.is_empty()).then(String::new);
  differ.work.push(Pair {
    a,
    b,
    path,
    slot: root,
  });

  while let Some(pair) = differ.work.pop() {
    let slot = pair.slot;
    differ.nodes[slot] = differ.compare(pair);
  }

  debug!(nodes = differ.nodes.len(), "diff_computed");
  differ.assemble()
}

/// Two values to compare, and where their comparison goes.
///
/// `path` is dropped once no required field can be found below it.
struct Pair<'v> {
  a: &'v Value,
  b: &'v Value,
  path: Option<String>,
  slot: usize,
}

enum Node {
  Empty,
  Object {
    entries: Vec<(String, Entry)>,
    required: Option<(String, Value)>,
  },
  List(Vec<Entry>),
  Leaf(Map<String, Value>),
}

enum Entry {
  Node(usize),
  Value(Value),
}

struct Differ<'v, 'c> {
  labels: &'c Labels,
  required: &'c RequiredFields,
  nodes: Vec<Node>,
  work: Vec<Pair<'v>>,
}

impl<'v> Differ<'v, '_> {
  fn alloc(&mut self) -> usize {
    self.nodes.push(Node::Empty);
    self.nodes.len() - 1
  }

  fn queue(&mut self, a: &'v Value, b: &'v Value, path: Option<String>) -> Entry {
    let slot = self.alloc();
    self.work.push(Pair { a, b, path, slot });
    Entry::Node(slot)
  }

  fn required_at(&self, path: Option<&str>) -> Option<&'_ str> {
    path.and_then(|path| self.required.get(path))
  }

  fn compare(&mut self, pair: Pair<'v>) -> Node {
    let Pair { a, b, path, .. } = pair;
    let path = path.as_deref();
    match (a, b) {
      (Value::Object(left), Value::Object(right)) => self.compare_objects(left, right, path),
      (Value::Array(left), Value::Array(right)) => self.compare_lists(left, right, path),
      _ if kind_name(a) != kind_name(b) => self.type_mismatch(a, b, path),
      _ if same_scalar(a, b) => Node::Empty,
      _ => {
        let mut leaf = Map::new();
        leaf.insert(self.labels.missing_in_a(), b.clone());
        leaf.insert(self.labels.missing_in_b(), a.clone());
        Node::Leaf(leaf)
      }
    }
  }

  fn compare_objects(
    &mut self,
    left: &'v Map<String, Value>,
    right: &'v Map<String, Value>,
    path: Option<&str>,
  ) -> Node {
    let keys: BTreeSet<&'v String> = left.keys().chain(right.keys()).collect();
    let mut entries = Vec::new();

    for key in keys {
      let entry = match (left.get(key), right.get(key)) {
        (Some(x), Some(y)) => {
          let child = path.and_then(|path| self.required.below(path, key));
          self.queue(x, y, child)
        }
        (None, Some(y)) => Entry::Value(self.one_sided(self.labels.missing_in_a(), y)),
        (Some(x), None) => Entry::Value(self.one_sided(self.labels.missing_in_b(), x)),
        (None, None) => continue,
      };
      entries.push((key.clone(), entry));
    }

    let required = self.required_at(path).and_then(|field| {
      right
        .get(field)
        .or_else(|| left.get(field))
        .map(|value| (field.to_string(), value.clone()))
    });

    Node::Object { entries, required }
  }

  fn compare_lists(&mut self, left: &'v [Value], right: &'v [Value], path: Option<&str>) -> Node {
    let mut entries = Vec::new();

    for index in 0..left.len().max(right.len()) {
      let entry = match (left.get(index), right.get(index)) {
        (Some(x), Some(y)) => self.queue(x, y, path.map(str::to_string)),
        (None, Some(y)) => Entry::Value(self.missing_element(self.labels.missing_in_a(), y, path)),
        (Some(x), None) => Entry::Value(self.missing_element(self.labels.missing_in_b(), x, path)),
        (None, None) => continue,
      };
      entries.push(entry);
    }

    Node::List(entries)
  }

  fn type_mismatch(&self, a: &Value, b: &Value, path: Option<&str>) -> Node {
    let mut leaf = Map::new();
    leaf.insert(self.labels.type_a(), Value::from(kind_name(a)));
    leaf.insert(self.labels.type_b(), Value::from(kind_name(b)));

    if let Some(field) = self.required_at(path)
      && let Some(value) = b.get(field).or_else(|| a.get(field))
    {
      leaf.insert(field.to_string(), value.clone());
    }

    Node::Leaf(leaf)
  }

  /// A list element present on one side only. Carries the required field,
  /// if any, so the record stays identifiable.
  fn missing_element(&self, label: String, element: &Value, path: Option<&str>) -> Value {
    let mut leaf = Map::new();
    leaf.insert(label, element.clone());

    if let Some(field) = self.required_at(path)
      && let Some(value) = element.get(field)
    {
      leaf.insert(field.to_string(), value.clone());
    }

    Value::Object(leaf)
  }

  fn one_sided(&self, label: String, value: &Value) -> Value {
    let mut leaf = Map::new();
    leaf.insert(label, value.clone());
    Value::Object(leaf)
  }

  /// Build the output tree, dropping nodes that recorded nothing.
  ///
  /// Children always have larger ids than their parent, so walking the
  /// arena backwards sees every child before it is needed.
  fn assemble(self) -> Value {
    let mut built: Vec<Option<Value>> = vec![None; self.nodes.len()];

    for (id, node) in self.nodes.into_iter().enumerate().rev() {
      let value = match node {
        Node::Empty => None,
        Node::Leaf(leaf) => Some(Value::Object(leaf)),
        Node::Object { entries, required } => {
          let mut map: Map<String, Value> = entries
            .into_iter()
            .filter_map(|(key, entry)| take(entry, &mut built).map(|value| (key, value)))
            .collect();
          if let Some((field, value)) = required
            && !map.is_empty()
            && !map.contains_key(&field)
          {
            map.insert(field, value);
          }
          (!map.is_empty()).then_some(Value::Object(map))
        }
        Node::List(entries) => {
          let items: Vec<Value> = entries
            .into_iter()
            .filter_map(|entry| take(entry, &mut built))
            .collect();
          (!items.is_empty()).then_some(Value::Array(items))
        }
      };
      built[id] = value;
    }

    built
      .first_mut()
      .and_then(Option::take)
      .unwrap_or_else(|| Value::Object(Map::new()))
  }
}

/// Scalars of one kind. Numbers compare by value, so `1` and `1.0` match.
fn same_scalar(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => {
      x == y || matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
    }
    _ => a == b,
  }
}

fn take(entry: Entry, built: &mut [Option<Value>]) -> Option<Value> {
  match entry {
    Entry::Value(value) => Some(value),
    Entry::Node(id) => built[id].take(),
  }
}
