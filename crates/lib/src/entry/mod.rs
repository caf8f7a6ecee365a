//! Directory entries and the identity model built on them.
//!
//! An [`Entry`] is one addressable node of the hierarchical store: a [`Dn`]
//! plus an [`Attributes`] mapping. The typed [`User`] and [`Group`] views in
//! [`model`] are decoded from entries returned by searches.

use serde::{Deserialize, Serialize};

use crate::attrs::{Attributes, Value};
use crate::constants::{GROUP_CLASS, OBJECT_CLASS, USER_CLASS};
use crate::dn::Dn;

pub mod model;

pub use model::{Group, Member, Membership, MembershipMode, User};

/// Classification of an entry by its `objectClass` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryClass {
    User,
    Group,
    /// Carries both classes, as user private groups do in merged deployments.
    UserGroup,
    /// Containers and anything else.
    Other,
}

/// A node of the hierarchical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: Dn,
    attributes: Attributes,
}

impl Entry {
    /// Create an entry without attributes.
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(dn: Dn, attributes: Attributes) -> Self {
        Self { dn, attributes }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn into_parts(self) -> (Dn, Attributes) {
        (self.dn, self.attributes)
    }

    /// Whether `objectClass` contains `class` (case-insensitive).
    pub fn has_class(&self, class: &str) -> bool {
        self.attributes.get(OBJECT_CLASS).is_some_and(|values| {
            values
                .iter()
                .any(|v| v.eq_ignore_ascii_case(&Value::from(class)))
        })
    }

    pub fn class(&self) -> EntryClass {
        match (self.has_class(USER_CLASS), self.has_class(GROUP_CLASS)) {
            (true, true) => EntryClass::UserGroup,
            (true, false) => EntryClass::User,
            (false, true) => EntryClass::Group,
            (false, false) => EntryClass::Other,
        }
    }

    /// Copy of this entry with only the requested attributes.
    pub fn project(&self, names: &[&str]) -> Entry {
        Entry {
            dn: self.dn.clone(),
            attributes: self.attributes.project(names),
        }
    }
}
