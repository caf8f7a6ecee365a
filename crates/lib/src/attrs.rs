//! Multi-valued attribute mappings.
//!
//! [`Attributes`] is the attribute mapping carried by every [`Entry`](crate::Entry):
//! names are unique per mapping (compared case-insensitively) and each name
//! owns an ordered list of [`Value`]s. [`Attrs`] is the request-scoped staging
//! object callers fill before handing it to a write call such as
//! [`Request::set_user_attr`](crate::Request::set_user_attr).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single attribute value.
///
/// Values are byte strings; most are UTF-8 text and numbers are stored in
/// their decimal text form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Value(Vec<u8>);

impl Value {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The value as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The value parsed as a decimal integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_str()?.trim().parse().ok()
    }

    /// The value parsed as an unsigned 32-bit id (uid/gid).
    pub fn as_u32(&self) -> Option<u32> {
        self.as_str()?.trim().parse().ok()
    }

    /// ASCII case-insensitive comparison, used for DN-valued attributes.
    pub fn eq_ignore_ascii_case(&self, other: &Value) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s:?}"),
            None => write!(f, "<{} bytes>", self.0.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self(n.to_string().into_bytes())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self(n.to_string().into_bytes())
    }
}

impl From<&crate::Dn> for Value {
    fn from(dn: &crate::Dn) -> Self {
        Self::from(dn.as_str())
    }
}

// Text values persist as JSON strings, anything else as a byte array.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serde_bytes::Bytes::new(&self.0).serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Text(String),
    Binary(serde_bytes::ByteBuf),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ValueRepr::deserialize(deserializer)? {
            ValueRepr::Text(s) => Value::from(s),
            ValueRepr::Binary(b) => Value(b.into_vec()),
        })
    }
}

/// Ordered mapping from attribute name to an ordered value list.
#[derive(Clone, Default)]
pub struct Attributes {
    items: Vec<(String, Vec<Value>)>,
    /// lower-cased name -> position in `items`
    index: HashMap<String, usize>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct attribute names.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_ascii_lowercase(), i))
            .collect();
    }

    /// All values of `name`, in insertion order.
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.position(name).map(|i| self.items[i].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// First value of `name`.
    pub fn first(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(|values| values.first())
    }

    /// First value of `name` as text.
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(Value::as_str)
    }

    /// First value of `name` as an integer.
    pub fn first_i64(&self, name: &str) -> Option<i64> {
        self.first(name).and_then(Value::as_i64)
    }

    /// First value of `name` as a 32-bit id.
    pub fn first_u32(&self, name: &str) -> Option<u32> {
        self.first(name).and_then(Value::as_u32)
    }

    /// Whether `name` holds `value`.
    pub fn has_value(&self, name: &str, value: &Value) -> bool {
        self.get(name).is_some_and(|values| values.contains(value))
    }

    /// Append `value` to `name`, creating the attribute if needed.
    pub fn append(&mut self, name: &str, value: Value) {
        match self.position(name) {
            Some(i) => self.items[i].1.push(value),
            None => {
                self.index
                    .insert(name.to_ascii_lowercase(), self.items.len());
                self.items.push((name.to_string(), vec![value]));
            }
        }
    }

    /// Replace all values of `name`. An empty list removes the attribute.
    pub fn set(&mut self, name: &str, values: Vec<Value>) {
        if values.is_empty() {
            self.remove(name);
            return;
        }
        match self.position(name) {
            Some(i) => self.items[i].1 = values,
            None => {
                self.index
                    .insert(name.to_ascii_lowercase(), self.items.len());
                self.items.push((name.to_string(), values));
            }
        }
    }

    /// Remove `name` entirely, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<Value>> {
        let i = self.position(name)?;
        let (_, values) = self.items.remove(i);
        self.reindex();
        Some(values)
    }

    /// Remove one value of `name`. Drops the attribute when its last value goes.
    ///
    /// Returns whether the value was present.
    pub fn remove_value(&mut self, name: &str, value: &Value) -> bool {
        let Some(i) = self.position(name) else {
            return false;
        };
        let values = &mut self.items[i].1;
        let Some(pos) = values.iter().position(|v| v == value) else {
            return false;
        };
        values.remove(pos);
        if values.is_empty() {
            self.items.remove(i);
            self.reindex();
        }
        true
    }

    /// Iterate `(name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.items
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Copy of this mapping restricted to `names`. An empty list keeps everything.
    pub fn project(&self, names: &[&str]) -> Attributes {
        if names.is_empty() {
            return self.clone();
        }
        let mut out = Attributes::new();
        for (name, values) in self.iter() {
            if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                out.set(name, values.to_vec());
            }
        }
        out
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Attributes {}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<(String, Vec<Value>)>::deserialize(deserializer)?;
        let mut attributes = Attributes::new();
        for (name, values) in items {
            for value in values {
                attributes.append(&name, value);
            }
        }
        Ok(attributes)
    }
}

/// Staging container for the attributes of an add or modify request.
///
/// Owned by its creator until moved into a write call.
///
/// ```
/// use idcache::Attrs;
///
/// let mut attrs = Attrs::new();
/// attrs.add_string("loginShell", "/bin/zsh");
/// attrs.add_long("lastLogin", 1_700_000_000);
/// attrs.add_string("loginShell", "/bin/bash");
///
/// assert_eq!(attrs.len(), 2);
/// assert_eq!(attrs.get("loginShell").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs {
    inner: Attributes,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw value under `name`.
    pub fn add_val(&mut self, name: &str, value: Value) -> &mut Self {
        self.inner.append(name, value);
        self
    }

    /// Add a string value under `name`.
    pub fn add_string(&mut self, name: &str, value: &str) -> &mut Self {
        self.add_val(name, Value::from(value))
    }

    /// Add an integer value under `name`.
    pub fn add_long(&mut self, name: &str, value: i64) -> &mut Self {
        self.add_val(name, Value::from(value))
    }

    /// Number of distinct names staged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.inner.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.inner.iter()
    }

    /// Consume the staging object.
    pub fn into_attributes(self) -> Attributes {
        self.inner
    }
}

impl From<Attrs> for Attributes {
    fn from(attrs: Attrs) -> Self {
        attrs.into_attributes()
    }
}
