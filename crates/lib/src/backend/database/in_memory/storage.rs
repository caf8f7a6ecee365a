//! Core storage operations for the InMemory engine
//!
//! These functions work on an unlocked [`Tree`]; the caller holds the engine
//! lock and has already checked transaction state.

use std::collections::HashMap;

use crate::{
    Result,
    attrs::Attributes,
    backend::{Modification, ModifyMode, Scope, errors::BackendError},
    dn::Dn,
    entry::Entry,
    filter::Filter,
};

/// A stored entry with its creation sequence number.
#[derive(Debug, Clone)]
pub(crate) struct Stored {
    pub(crate) seq: u64,
    pub(crate) entry: Entry,
}

/// The full hierarchical store, keyed by normalized DN.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    pub(crate) entries: HashMap<String, Stored>,
    pub(crate) next_seq: u64,
}

impl Tree {
    pub(crate) fn insert(&mut self, entry: Entry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(entry.dn().normalized().to_string(), Stored { seq, entry });
    }

    /// Entries in creation order.
    pub(crate) fn ordered(&self) -> Vec<&Entry> {
        let mut stored: Vec<&Stored> = self.entries.values().collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| &s.entry).collect()
    }

    fn contains(&self, dn: &Dn) -> bool {
        self.entries.contains_key(dn.normalized())
    }
}

pub(crate) fn add(tree: &mut Tree, entry: Entry) -> Result<()> {
    let dn = entry.dn().clone();
    if tree.contains(&dn) {
        return Err(BackendError::EntryAlreadyExists { dn: dn.to_string() }.into());
    }
    if let Some(parent) = dn.parent()
        && !tree.contains(&parent)
    {
        return Err(BackendError::NoSuchObject {
            dn: parent.to_string(),
        }
        .into());
    }
    for (name, values) in entry.attributes().iter() {
        check_attribute(name)?;
        if values.is_empty() {
            return Err(BackendError::InvalidAttributeSyntax {
                attribute: name.to_string(),
                reason: "no values".to_string(),
            }
            .into());
        }
    }
    tree.insert(entry);
    Ok(())
}

fn check_attribute(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ';');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidAttributeSyntax {
            attribute: name.to_string(),
            reason: "invalid attribute name".to_string(),
        }
        .into())
    }
}

/// Apply `mods` to a copy of the entry's attributes and swap it in only if
/// every modification succeeds.
pub(crate) fn modify(tree: &mut Tree, dn: &Dn, mods: Vec<Modification>) -> Result<()> {
    let stored = tree
        .entries
        .get_mut(dn.normalized())
        .ok_or_else(|| BackendError::NoSuchObject { dn: dn.to_string() })?;

    let mut attrs: Attributes = stored.entry.attributes().clone();
    for m in mods {
        check_attribute(&m.attribute)?;
        apply(&mut attrs, dn, m)?;
    }
    *stored.entry.attributes_mut() = attrs;
    Ok(())
}

fn apply(attrs: &mut Attributes, dn: &Dn, m: Modification) -> Result<()> {
    match m.mode {
        ModifyMode::Add => {
            for value in m.values {
                if attrs.has_value(&m.attribute, &value) {
                    return Err(BackendError::AttributeOrValueExists {
                        dn: dn.to_string(),
                        attribute: m.attribute,
                    }
                    .into());
                }
                attrs.append(&m.attribute, value);
            }
        }
        ModifyMode::Replace => attrs.set(&m.attribute, m.values),
        ModifyMode::Delete if m.values.is_empty() => {
            if attrs.remove(&m.attribute).is_none() {
                return Err(BackendError::NoSuchAttribute {
                    dn: dn.to_string(),
                    attribute: m.attribute,
                }
                .into());
            }
        }
        ModifyMode::Delete => {
            for value in &m.values {
                if !attrs.remove_value(&m.attribute, value) {
                    return Err(BackendError::NoSuchAttribute {
                        dn: dn.to_string(),
                        attribute: m.attribute.clone(),
                    }
                    .into());
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn delete(tree: &mut Tree, dn: &Dn) -> Result<()> {
    if !tree.contains(dn) {
        return Err(BackendError::NoSuchObject { dn: dn.to_string() }.into());
    }
    let has_children = tree
        .entries
        .values()
        .any(|s| s.entry.dn().is_child_of(dn));
    if has_children {
        return Err(BackendError::NotAllowedOnNonLeaf { dn: dn.to_string() }.into());
    }
    tree.entries.remove(dn.normalized());
    Ok(())
}

pub(crate) fn search(
    tree: &Tree,
    base: &Dn,
    scope: Scope,
    filter: &Filter,
    attrs: &[&str],
) -> Result<Vec<Entry>> {
    if !tree.contains(base) {
        return Err(BackendError::NoSuchObject {
            dn: base.to_string(),
        }
        .into());
    }
    let in_scope = |dn: &Dn| match scope {
        Scope::Base => dn == base,
        Scope::OneLevel => dn.is_child_of(base),
        Scope::Subtree => dn == base || dn.is_descendant_of(base),
    };
    Ok(tree
        .ordered()
        .into_iter()
        .filter(|entry| in_scope(entry.dn()) && filter.matches(entry.attributes()))
        .map(|entry| entry.project(attrs))
        .collect())
}
