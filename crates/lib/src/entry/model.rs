//! Typed user and group views over cached entries.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Entry;
use crate::Result;
use crate::attrs::Value;
use crate::constants::{
    CREATE_TIME, FULLNAME, GECOS, GID_NUMBER, HOMEDIR, LAST_UPDATE, LEGACY_MEMBER, MEMBER,
    MEMBEROF, NAME, PASSWORD, SHELL, UID_NUMBER,
};
use crate::dn::Dn;
use crate::identity::IdentityError;

/// How a domain records group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipMode {
    /// `member` holds DN references to member entries.
    #[default]
    Native,
    /// `memberUid` holds flat member names, as proxy sources expose them.
    Legacy,
}

impl MembershipMode {
    /// Attribute of a group entry that stores its members in this mode.
    pub fn attribute(self) -> &'static str {
        match self {
            MembershipMode::Native => MEMBER,
            MembershipMode::Legacy => LEGACY_MEMBER,
        }
    }
}

/// A prospective or actual group member, addressable both ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    name: String,
    dn: Dn,
}

impl Member {
    pub fn new(name: impl Into<String>, dn: Dn) -> Self {
        Self {
            name: name.into(),
            dn,
        }
    }

    /// Member identified by its entry address; the name is the leaf value.
    pub fn from_dn(dn: Dn) -> Self {
        let name = dn.rdn_value().unwrap_or_default();
        Self { name, dn }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Value stored in the membership attribute for `mode`.
    pub fn value(&self, mode: MembershipMode) -> Value {
        match mode {
            MembershipMode::Native => Value::from(&self.dn),
            MembershipMode::Legacy => Value::from(self.name.as_str()),
        }
    }
}

/// Group membership in the representation of the owning domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Membership {
    Native(Vec<Dn>),
    Legacy(Vec<String>),
}

impl Membership {
    pub fn empty(mode: MembershipMode) -> Self {
        match mode {
            MembershipMode::Native => Membership::Native(Vec::new()),
            MembershipMode::Legacy => Membership::Legacy(Vec::new()),
        }
    }

    pub fn mode(&self) -> MembershipMode {
        match self {
            Membership::Native(_) => MembershipMode::Native,
            Membership::Legacy(_) => MembershipMode::Legacy,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Membership::Native(dns) => dns.len(),
            Membership::Legacy(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, member: &Member) -> bool {
        match self {
            Membership::Native(dns) => dns.contains(member.dn()),
            Membership::Legacy(names) => names.iter().any(|n| n == member.name()),
        }
    }

    /// Add `member`; returns false if it was already present.
    pub fn add(&mut self, member: &Member) -> bool {
        if self.contains(member) {
            return false;
        }
        match self {
            Membership::Native(dns) => dns.push(member.dn().clone()),
            Membership::Legacy(names) => names.push(member.name().to_string()),
        }
        true
    }

    /// Remove `member`; returns false if it was not present.
    pub fn remove(&mut self, member: &Member) -> bool {
        let before = self.len();
        match self {
            Membership::Native(dns) => dns.retain(|dn| dn != member.dn()),
            Membership::Legacy(names) => names.retain(|n| n != member.name()),
        }
        self.len() != before
    }

    /// Member names; for native membership the leaf value of each reference.
    pub fn names(&self) -> Vec<String> {
        match self {
            Membership::Native(dns) => dns.iter().filter_map(Dn::rdn_value).collect(),
            Membership::Legacy(names) => names.clone(),
        }
    }

    /// Values to store in the membership attribute.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Membership::Native(dns) => dns.iter().map(Value::from).collect(),
            Membership::Legacy(names) => names.iter().map(Value::from).collect(),
        }
    }

    /// Decode the membership attribute of `entry` for `mode`.
    ///
    /// References that fail to parse are skipped with a warning.
    pub fn from_entry(entry: &Entry, mode: MembershipMode) -> Self {
        let values = entry.attributes().get(mode.attribute()).unwrap_or_default();
        match mode {
            MembershipMode::Native => Membership::Native(
                values
                    .iter()
                    .filter_map(|v| {
                        let parsed = v.as_str().map(Dn::parse);
                        match parsed {
                            Some(Ok(dn)) => Some(dn),
                            _ => {
                                warn!(entry = %entry.dn(), value = ?v, "Skipping malformed member reference");
                                None
                            }
                        }
                    })
                    .collect(),
            ),
            MembershipMode::Legacy => Membership::Legacy(
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
        }
    }
}

fn malformed(entry: &Entry, reason: &str) -> crate::Error {
    IdentityError::MalformedEntry {
        dn: entry.dn().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// A cached user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub dn: Dn,
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub fullname: Option<String>,
    pub gecos: Option<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
    /// Only present when the lookup requested it.
    pub password: Option<String>,
    pub member_of: Vec<Dn>,
    pub create_time: Option<i64>,
    pub last_update: Option<i64>,
}

impl User {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let attrs = entry.attributes();
        let name = attrs
            .first_str(NAME)
            .ok_or_else(|| malformed(entry, "missing name"))?
            .to_string();
        let uid = attrs
            .first_u32(UID_NUMBER)
            .ok_or_else(|| malformed(entry, "missing or invalid uidNumber"))?;
        let gid = attrs
            .first_u32(GID_NUMBER)
            .ok_or_else(|| malformed(entry, "missing or invalid gidNumber"))?;
        let text = |name: &str| attrs.first_str(name).map(str::to_string);

        Ok(User {
            dn: entry.dn().clone(),
            name,
            uid,
            gid,
            fullname: text(FULLNAME),
            gecos: text(GECOS),
            home: text(HOMEDIR),
            shell: text(SHELL),
            password: text(PASSWORD),
            member_of: attrs
                .get(MEMBEROF)
                .unwrap_or_default()
                .iter()
                .filter_map(|v| v.as_str().and_then(|s| Dn::parse(s).ok()))
                .collect(),
            create_time: attrs.first_i64(CREATE_TIME),
            last_update: attrs.first_i64(LAST_UPDATE),
        })
    }

    pub fn as_member(&self) -> Member {
        Member::new(self.name.clone(), self.dn.clone())
    }
}

/// A cached group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub dn: Dn,
    pub name: String,
    pub gid: u32,
    pub members: Membership,
    pub create_time: Option<i64>,
    pub last_update: Option<i64>,
}

impl Group {
    /// Decode a group entry, or in a merged domain a user entry acting as its
    /// own private group.
    pub fn from_entry(entry: &Entry, mode: MembershipMode) -> Result<Self> {
        let attrs = entry.attributes();
        let name = attrs
            .first_str(NAME)
            .ok_or_else(|| malformed(entry, "missing name"))?
            .to_string();
        let gid = attrs
            .first_u32(GID_NUMBER)
            .ok_or_else(|| malformed(entry, "missing or invalid gidNumber"))?;

        Ok(Group {
            dn: entry.dn().clone(),
            name,
            gid,
            members: Membership::from_entry(entry, mode),
            create_time: attrs.first_i64(CREATE_TIME),
            last_update: attrs.first_i64(LAST_UPDATE),
        })
    }
}
