//! Identity domains.

use crate::Result;
use crate::dn::{self, Dn};
use crate::entry::MembershipMode;

use super::IdentityError;

/// A named identity source owning the subtree `cn=<name>,cn=sysdb`.
///
/// Domains are fixed at startup; the addresses of their containers are
/// computed once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    name: String,
    membership: MembershipMode,
    mpg: bool,
    enumerate: bool,
    min_id: Option<u32>,
    max_id: Option<u32>,
    dn: Dn,
    user_base: Dn,
    group_base: Dn,
}

impl Domain {
    /// A native-membership domain that allows enumeration and any id.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            membership: MembershipMode::Native,
            mpg: false,
            enumerate: true,
            min_id: None,
            max_id: None,
            dn: dn::domain_dn(name)?,
            user_base: dn::user_base_dn(name)?,
            group_base: dn::group_base_dn(name)?,
        })
    }

    pub fn with_membership(mut self, membership: MembershipMode) -> Self {
        self.membership = membership;
        self
    }

    /// Treat user entries as their own private groups.
    pub fn with_mpg(mut self, mpg: bool) -> Self {
        self.mpg = mpg;
        self
    }

    pub fn with_enumerate(mut self, enumerate: bool) -> Self {
        self.enumerate = enumerate;
        self
    }

    pub fn with_id_range(mut self, min_id: Option<u32>, max_id: Option<u32>) -> Self {
        self.min_id = min_id;
        self.max_id = max_id;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn membership(&self) -> MembershipMode {
        self.membership
    }

    pub fn is_mpg(&self) -> bool {
        self.mpg
    }

    pub fn enumerates(&self) -> bool {
        self.enumerate
    }

    pub fn id_range(&self) -> (Option<u32>, Option<u32>) {
        (self.min_id, self.max_id)
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn user_base(&self) -> &Dn {
        &self.user_base
    }

    pub fn group_base(&self) -> &Dn {
        &self.group_base
    }

    pub fn user_dn(&self, name: &str) -> Result<Dn> {
        dn::user_dn(&self.name, name)
    }

    pub fn group_dn(&self, name: &str) -> Result<Dn> {
        dn::group_dn(&self.name, name)
    }

    /// Fail unless `id` is inside the configured range.
    pub fn check_id(&self, id: u32) -> Result<()> {
        let below = self.min_id.is_some_and(|min| id < min);
        let above = self.max_id.is_some_and(|max| id > max);
        if below || above {
            return Err(IdentityError::IdOutOfRange {
                id,
                min: self.min_id,
                max: self.max_id,
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn require_membership(&self, expected: MembershipMode) -> Result<()> {
        if self.membership != expected {
            return Err(IdentityError::WrongMembershipMode {
                domain: self.name.clone(),
                expected,
            }
            .into());
        }
        Ok(())
    }
}
