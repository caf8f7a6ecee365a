//! Hierarchical entry addresses (distinguished names).
//!
//! Every cached entry lives at a [`Dn`] of the form
//! `name=<name>,cn=<users|groups>,cn=<domain>,cn=sysdb`. The builder functions
//! in this module are the only way the rest of the crate produces addresses;
//! they reject names that would need escaping so that a DN always reads back
//! as the name it was built from.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::constants::{CN, GROUPS_CONTAINER, NAME, SYSDB_BASE, USERS_CONTAINER};

pub mod errors;

pub use errors::DnError;

/// A distinguished name.
///
/// Comparison, hashing and ordering are case-insensitive (ASCII) and ignore
/// insignificant spaces around separators, matching how the directory engine
/// matches `cn` and `name` values. The original spelling is preserved for
/// display and persistence.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    raw: String,
    norm: String,
}

impl Dn {
    /// Parse and syntax-check a DN string.
    ///
    /// Accepts backslash escapes inside values; rejects empty components and
    /// components without an `=`.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let raw = s.into();
        split_rdns(&raw)?;
        Ok(Self::from_checked(raw))
    }

    fn from_checked(raw: String) -> Self {
        let norm = match split_rdns(&raw) {
            Ok(parts) => canonical(&parts),
            Err(_) => raw.to_ascii_lowercase(),
        };
        Self { raw, norm }
    }

    /// The DN as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical lower-cased form used for comparisons and storage keys.
    pub fn normalized(&self) -> &str {
        &self.norm
    }

    /// Relative components, leaf first, as `(attribute, unescaped value)`.
    pub fn components(&self) -> Vec<(String, String)> {
        // Syntax was checked at construction.
        split_rdns(&self.raw).unwrap_or_default()
    }

    /// Unescaped value of the leaf component.
    pub fn rdn_value(&self) -> Option<String> {
        self.components().into_iter().next().map(|(_, value)| value)
    }

    /// Attribute type of the leaf component.
    pub fn rdn_attr(&self) -> Option<String> {
        self.components().into_iter().next().map(|(attr, _)| attr)
    }

    /// The DN with its leaf component removed, `None` for a single component.
    pub fn parent(&self) -> Option<Dn> {
        let idx = first_separator(&self.raw)?;
        Some(Self::from_checked(self.raw[idx + 1..].to_string()))
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components().len()
    }

    /// Whether `self` sits strictly below `base`.
    pub fn is_descendant_of(&self, base: &Dn) -> bool {
        let Some(prefix) = self.norm.strip_suffix(base.norm.as_str()) else {
            return false;
        };
        prefix
            .strip_suffix(',')
            .is_some_and(|head| !head.is_empty() && !ends_escaped(head))
    }

    /// Whether `self` is a direct child of `base`.
    pub fn is_child_of(&self, base: &Dn) -> bool {
        self.parent().is_some_and(|parent| &parent == base)
    }
}

/// Whether the last character of `s` is escaped by an odd run of backslashes.
fn ends_escaped(s: &str) -> bool {
    s.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Byte index of the first unescaped `,`.
fn first_separator(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_rdns(s: &str) -> Result<Vec<(String, String)>> {
    let invalid = || DnError::InvalidSyntax { dn: s.to_string() };
    if s.is_empty() {
        return Err(invalid().into());
    }

    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        let (head, tail) = match first_separator(rest) {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };
        let (attr, value) = head.split_once('=').ok_or_else(invalid)?;
        let attr = attr.trim();
        let value = trim_value(value);
        if attr.is_empty() || value.is_empty() {
            return Err(invalid().into());
        }
        parts.push((attr.to_string(), unescape(value).ok_or_else(invalid)?));
        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }
    Ok(parts)
}

/// Strip leading spaces and trailing spaces that are not escaped.
fn trim_value(value: &str) -> &str {
    let mut value = value.trim_start_matches(' ');
    while let Some(head) = value.strip_suffix(' ') {
        if ends_escaped(head) {
            break;
        }
        value = head;
    }
    value
}

/// Lower-cased `attr=value` components joined without spaces.
fn canonical(parts: &[(String, String)]) -> String {
    parts
        .iter()
        .map(|(attr, value)| {
            format!(
                "{}={}",
                attr.to_ascii_lowercase(),
                escape_value(value).to_ascii_lowercase()
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\0' => out.push_str("\\00"),
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let next = chars.next()?;
        if next.is_ascii_hexdigit() {
            let low = chars.next()?;
            let byte = u8::from_str_radix(&format!("{next}{low}"), 16).ok()?;
            out.push(char::from(byte));
        } else {
            out.push(next);
        }
    }
    Some(out)
}

/// Reject values that cannot appear unescaped in a DN component.
fn check_component(what: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DnError::Empty { what }.into());
    }
    let unsafe_char = value.chars().find(|c| {
        matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' | '\0')
    });
    if let Some(ch) = unsafe_char {
        return Err(DnError::UnsafeCharacter {
            value: value.to_string(),
            ch,
        }
        .into());
    }
    if value.starts_with(' ') || value.ends_with(' ') {
        return Err(DnError::UnsafeCharacter {
            value: value.to_string(),
            ch: ' ',
        }
        .into());
    }
    if value.starts_with('#') {
        return Err(DnError::UnsafeCharacter {
            value: value.to_string(),
            ch: '#',
        }
        .into());
    }
    Ok(())
}

/// Check that `domain` is usable as a domain name in addresses.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    check_component("domain", domain)
}

/// `cn=sysdb`
pub fn sysdb_dn() -> Dn {
    Dn::from_checked(SYSDB_BASE.to_string())
}

/// `cn=<domain>,cn=sysdb`
pub fn domain_dn(domain: &str) -> Result<Dn> {
    check_component("domain", domain)?;
    Ok(Dn::from_checked(format!("{CN}={domain},{SYSDB_BASE}")))
}

/// `cn=users,cn=<domain>,cn=sysdb`
pub fn user_base_dn(domain: &str) -> Result<Dn> {
    check_component("domain", domain)?;
    Ok(Dn::from_checked(format!(
        "{CN}={USERS_CONTAINER},{CN}={domain},{SYSDB_BASE}"
    )))
}

/// `cn=groups,cn=<domain>,cn=sysdb`
pub fn group_base_dn(domain: &str) -> Result<Dn> {
    check_component("domain", domain)?;
    Ok(Dn::from_checked(format!(
        "{CN}={GROUPS_CONTAINER},{CN}={domain},{SYSDB_BASE}"
    )))
}

/// `name=<name>,cn=users,cn=<domain>,cn=sysdb`
pub fn user_dn(domain: &str, name: &str) -> Result<Dn> {
    check_component("name", name)?;
    let base = user_base_dn(domain)?;
    Ok(Dn::from_checked(format!("{NAME}={name},{base}")))
}

/// `name=<name>,cn=groups,cn=<domain>,cn=sysdb`
pub fn group_dn(domain: &str, name: &str) -> Result<Dn> {
    check_component("name", name)?;
    let base = group_base_dn(domain)?;
    Ok(Dn::from_checked(format!("{NAME}={name},{base}")))
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dn({})", self.raw)
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.norm == other.norm
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.norm.hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.norm.cmp(&other.norm)
    }
}

impl TryFrom<String> for Dn {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self> {
        Dn::parse(value)
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.raw
    }
}
