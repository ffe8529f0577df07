use serde_json::Value;
use std::collections::BTreeMap;

/// A single named attribute attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: AttrValue,
}

/// Either a JSON leaf or a nested group of attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Scalar, array or object stored as-is under its dotted key.
    Value(Value),
    Group(Vec<Attr>),
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr {
            key: key.into(),
            value: AttrValue::Value(value.into()),
        }
    }

    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr {
            key: key.into(),
            value: AttrValue::Group(attrs),
        }
    }
}

/// Flatten an attribute tree into a map keyed by dotted paths.
///
/// `{a: {b: 1, c: {d: 2}}}` becomes `{"a.b": 1, "a.c.d": 2}`. When two
/// attributes resolve to the same key the later one wins.
pub fn flatten(attrs: &[Attr]) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(&mut out, "", attrs);
    out
}

/// Flatten `attrs` under `prefix`, inserting into an existing map.
pub fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: &str, attrs: &[Attr]) {
    for attr in attrs {
        let key = join_key(prefix, &attr.key);
        match &attr.value {
            // A group with an empty name is inlined into its parent.
            AttrValue::Group(children) => flatten_into(out, &key, children),
            AttrValue::Value(value) => {
                if attr.key.is_empty() {
                    continue;
                }
                out.insert(key, value.clone());
            }
        }
    }
}

pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}.{}", prefix, key),
    }
}
