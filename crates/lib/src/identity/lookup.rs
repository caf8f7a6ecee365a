//! Read-only identity lookups.
//!
//! These run on any [`Request`]. Absence is an empty result, never an error:
//! a lookup in a domain whose containers do not exist yet returns nothing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Domain;
use crate::Result;
use crate::backend::Scope;
use crate::constants::{GID_NUMBER, GR_ATTRS, NAME, PW_ATTRS, UID_NUMBER};
use crate::dn::Dn;
use crate::entry::{Entry, Group, MembershipMode, User};
use crate::filter::Filter;
use crate::queue::Request;

/// A user together with every group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initgroups {
    pub user: User,
    /// Primary group first (when it exists), then supplementary groups in
    /// store order, without duplicate gids.
    pub groups: Vec<Group>,
}

impl Initgroups {
    pub fn gids(&self) -> Vec<u32> {
        self.groups.iter().map(|group| group.gid).collect()
    }
}

/// Search base and scope covering group entries of `domain`.
///
/// In a merged domain user entries double as groups, so the whole domain
/// subtree is searched.
fn group_search(domain: &Domain) -> (&Dn, Scope) {
    if domain.is_mpg() {
        (domain.dn(), Scope::Subtree)
    } else {
        (domain.group_base(), Scope::OneLevel)
    }
}

/// `(objectClass=group)`, or `(|(objectClass=user)(objectClass=group))` in a
/// merged domain.
fn group_class(domain: &Domain) -> Filter {
    if domain.is_mpg() {
        Filter::or([Filter::user_class(), Filter::group_class()])
    } else {
        Filter::group_class()
    }
}

impl Request {
    /// Search that treats a missing base as an empty result.
    pub(crate) async fn search_or_empty(
        &self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        match self.search(base, scope, filter, attrs).await {
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            other => other,
        }
    }

    async fn find_users(&self, domain: &Domain, filter: Filter) -> Result<Vec<User>> {
        let filter = Filter::and([Filter::user_class(), filter]);
        let entries = self
            .search_or_empty(domain.user_base(), Scope::OneLevel, &filter, PW_ATTRS)
            .await?;
        Ok(entries
            .iter()
            .filter_map(|entry| match User::from_entry(entry) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "Skipping malformed user entry");
                    None
                }
            })
            .collect())
    }

    async fn find_groups(&self, domain: &Domain, filter: Filter) -> Result<Vec<Group>> {
        let (base, scope) = group_search(domain);
        let filter = Filter::and([group_class(domain), filter]);
        let entries = self
            .search_or_empty(base, scope, &filter, GR_ATTRS)
            .await?;
        Ok(entries
            .iter()
            .filter_map(|entry| match Group::from_entry(entry, domain.membership()) {
                Ok(group) => Some(group),
                Err(err) => {
                    warn!(error = %err, "Skipping malformed group entry");
                    None
                }
            })
            .collect())
    }

    pub async fn get_user_by_name(&self, domain: &Domain, name: &str) -> Result<Vec<User>> {
        self.find_users(domain, Filter::eq(NAME, name)).await
    }

    pub async fn get_user_by_id(&self, domain: &Domain, uid: u32) -> Result<Vec<User>> {
        self.find_users(domain, Filter::eq(UID_NUMBER, uid)).await
    }

    /// Every user of `domain`, optionally narrowed by `extra`.
    ///
    /// Returns nothing when the domain does not allow enumeration.
    pub async fn enumerate_users(
        &self,
        domain: &Domain,
        extra: Option<Filter>,
    ) -> Result<Vec<User>> {
        if !domain.enumerates() {
            return Ok(Vec::new());
        }
        self.find_users(domain, extra.unwrap_or_else(Filter::everything))
            .await
    }

    pub async fn get_group_by_name(&self, domain: &Domain, name: &str) -> Result<Vec<Group>> {
        self.find_groups(domain, Filter::eq(NAME, name)).await
    }

    pub async fn get_group_by_id(&self, domain: &Domain, gid: u32) -> Result<Vec<Group>> {
        self.find_groups(domain, Filter::eq(GID_NUMBER, gid)).await
    }

    /// Every group of `domain`, optionally narrowed by `extra`.
    ///
    /// Returns nothing when the domain does not allow enumeration.
    pub async fn enumerate_groups(
        &self,
        domain: &Domain,
        extra: Option<Filter>,
    ) -> Result<Vec<Group>> {
        if !domain.enumerates() {
            return Ok(Vec::new());
        }
        self.find_groups(domain, extra.unwrap_or_else(Filter::everything))
            .await
    }

    /// The user `name` and the groups it belongs to, `None` if there is no
    /// such user.
    pub async fn get_initgroups_for_user(
        &self,
        domain: &Domain,
        name: &str,
    ) -> Result<Option<Initgroups>> {
        let Some(user) = self.get_user_by_name(domain, name).await?.into_iter().next() else {
            return Ok(None);
        };

        let mut groups = self.get_group_by_id(domain, user.gid).await?;
        let membership = match domain.membership() {
            MembershipMode::Native => Filter::eq(MembershipMode::Native.attribute(), &user.dn),
            MembershipMode::Legacy => {
                Filter::eq(MembershipMode::Legacy.attribute(), user.name.as_str())
            }
        };
        groups.extend(self.find_groups(domain, membership).await?);

        let mut seen = std::collections::HashSet::new();
        groups.retain(|group| seen.insert(group.gid));
        Ok(Some(Initgroups { user, groups }))
    }

    /// Raw entries of user `name` carrying only `attrs` (all when empty).
    pub async fn get_user_attr(
        &self,
        domain: &Domain,
        name: &str,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        let filter = Filter::and([Filter::user_class(), Filter::eq(NAME, name)]);
        self.search_or_empty(domain.user_base(), Scope::OneLevel, &filter, attrs)
            .await
    }
}
