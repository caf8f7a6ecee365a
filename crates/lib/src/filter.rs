//! Search filters.
//!
//! A [`Filter`] combines equality, presence and wildcard tests with
//! AND/OR/NOT. Filters are evaluated by the storage engine against entry
//! attributes and render to the familiar RFC 4515 string form for logging.

use std::fmt;

use crate::attrs::{Attributes, Value};
use crate::constants::{GROUP_CLASS, MEMBER, MEMBEROF, OBJECT_CLASS, USER_CLASS};
use crate::dn::Dn;

/// Attributes whose values are DNs and therefore match as parsed DNs.
const DN_VALUED: &[&str] = &[MEMBER, MEMBEROF];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// `(attr=value)`
    Equals { attribute: String, value: Value },
    /// `(attr=*)`
    Present { attribute: String },
    /// `(attr=initial*any*final)`; every part is optional.
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
    /// `(attr>=value)` on integer values.
    GreaterOrEqual { attribute: String, value: i64 },
}

impl Filter {
    pub fn eq(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::Equals {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn present(attribute: &str) -> Self {
        Filter::Present {
            attribute: attribute.to_string(),
        }
    }

    /// Wildcard match from a pattern such as `"al*"` or `"*ice"`.
    pub fn wildcard(attribute: &str, pattern: &str) -> Self {
        if !pattern.contains('*') {
            return Filter::eq(attribute, pattern);
        }
        let parts: Vec<&str> = pattern.split('*').collect();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let initial = parts.first().and_then(|s| non_empty(s));
        let last = parts.last().and_then(|s| non_empty(s));
        let any = parts[1..parts.len() - 1]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Filter::Substring {
            attribute: attribute.to_string(),
            initial,
            any,
            last,
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Empty AND; matches every entry.
    pub fn everything() -> Self {
        Filter::And(Vec::new())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// `(objectClass=user)`
    pub fn user_class() -> Self {
        Filter::eq(OBJECT_CLASS, USER_CLASS)
    }

    /// `(objectClass=group)`
    pub fn group_class() -> Self {
        Filter::eq(OBJECT_CLASS, GROUP_CLASS)
    }

    /// Evaluate against an attribute mapping.
    pub fn matches(&self, attrs: &Attributes) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(attrs)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(attrs)),
            Filter::Not(filter) => !filter.matches(attrs),
            Filter::Present { attribute } => attrs.contains(attribute),
            Filter::Equals { attribute, value } => {
                let values = attrs.get(attribute).unwrap_or_default();
                if is_dn_valued(attribute)
                    && let Some(wanted) = as_dn(value)
                {
                    values.iter().any(|v| as_dn(v).as_ref() == Some(&wanted))
                } else if is_case_insensitive(attribute) {
                    values.iter().any(|v| v.eq_ignore_ascii_case(value))
                } else {
                    values.contains(value)
                }
            }
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => attrs
                .get(attribute)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .any(|s| substring_match(s, initial.as_deref(), any, last.as_deref())),
            Filter::GreaterOrEqual { attribute, value } => attrs
                .get(attribute)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_i64)
                .any(|v| v >= *value),
        }
    }
}

fn is_dn_valued(attribute: &str) -> bool {
    DN_VALUED.iter().any(|a| a.eq_ignore_ascii_case(attribute))
}

fn is_case_insensitive(attribute: &str) -> bool {
    attribute.eq_ignore_ascii_case(OBJECT_CLASS) || is_dn_valued(attribute)
}

fn as_dn(value: &Value) -> Option<Dn> {
    value.as_str().and_then(|s| Dn::parse(s).ok())
}

fn substring_match(s: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let mut rest = s;
    if let Some(initial) = initial {
        match rest.strip_prefix(initial) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for part in any {
        match rest.find(part.as_str()) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    match last {
        Some(last) => rest.ends_with(last),
        None => true,
    }
}

/// Escape special characters in filter values (RFC 4515).
pub fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equals { attribute, value } => {
                let text = value
                    .as_str()
                    .map(escape_value)
                    .unwrap_or_else(|| "<binary>".to_string());
                write!(f, "({attribute}={text})")
            }
            Filter::Present { attribute } => write!(f, "({attribute}=*)"),
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    write!(f, "{}", escape_value(initial))?;
                }
                write!(f, "*")?;
                for part in any {
                    write!(f, "{}*", escape_value(part))?;
                }
                if let Some(last) = last {
                    write!(f, "{}", escape_value(last))?;
                }
                write!(f, ")")
            }
            Filter::GreaterOrEqual { attribute, value } => write!(f, "({attribute}>={value})"),
        }
    }
}
