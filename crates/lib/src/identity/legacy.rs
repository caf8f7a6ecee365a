//! Verbs for proxy domains that only know flat user and group records.
//!
//! Stores create the entry or replace its attributes wholesale, and group
//! membership is a list of member names (`memberUid`) rather than references.
//! All of them refuse to run on a native-membership domain.

use tracing::debug;

use super::{ALLOCATE_ID, Domain, IdentityError, UserRecord};
use crate::Result;
use crate::attrs::Value;
use crate::backend::Modification;
use crate::constants::{GID_NUMBER, LEGACY_MEMBER, UID_NUMBER};
use crate::entry::{Membership, MembershipMode};
use crate::filter::Filter;
use crate::queue::Request;

/// `id`, or the stored id when `id` asks for allocation.
fn keep_if_allocating(id: u32, stored: Option<u32>) -> u32 {
    match stored {
        Some(stored) if id == ALLOCATE_ID => stored,
        _ => id,
    }
}

impl Request {
    /// Create user `user.name`, or replace every attribute of the existing one.
    ///
    /// Attributes absent from `user` are removed from an existing entry. An id
    /// of [`ALLOCATE_ID`] allocates one on creation and keeps the stored one on
    /// replacement.
    pub async fn legacy_store_user(&self, domain: &Domain, user: &UserRecord) -> Result<()> {
        domain.require_membership(MembershipMode::Legacy)?;
        let dn = domain.user_dn(&user.name)?;
        let Some(existing) = self.get(&dn, &[]).await? else {
            return self.add_user(domain, user).await;
        };

        let stored = existing.attributes();
        let uid = keep_if_allocating(user.uid, stored.first_u32(UID_NUMBER));
        let gid = keep_if_allocating(user.gid, stored.first_u32(GID_NUMBER));
        domain.check_id(uid)?;
        domain.check_id(gid)?;
        self.check_unique_id(
            domain,
            domain.user_base(),
            Filter::user_class(),
            UID_NUMBER,
            uid,
            Some(&dn),
        )
        .await?;
        let mut mods = vec![
            Modification::replace(UID_NUMBER, vec![Value::from(uid)]),
            Modification::replace(GID_NUMBER, vec![Value::from(gid)]),
        ];
        for (name, value) in user.optional_attrs() {
            mods.push(Modification::replace(
                name,
                value.map(Value::from).into_iter().collect(),
            ));
        }
        mods.push(self.touch(&existing));
        self.modify(&dn, mods).await?;
        debug!(domain = domain.name(), name = %user.name, "Replaced user");
        Ok(())
    }

    /// Create group `name`, or replace its gid and member list.
    ///
    /// Repeated member names are stored once, in order of first appearance.
    pub async fn legacy_store_group(
        &self,
        domain: &Domain,
        name: &str,
        gid: u32,
        members: &[&str],
    ) -> Result<()> {
        domain.require_membership(MembershipMode::Legacy)?;
        let dn = domain.group_dn(name)?;
        let mut values: Vec<Value> = Vec::with_capacity(members.len());
        for member in members {
            let value = Value::from(*member);
            if !values.contains(&value) {
                values.push(value);
            }
        }

        match self.get(&dn, &[]).await? {
            None => {
                self.add_group(domain, name, gid).await?;
                if !values.is_empty() {
                    self.modify(&dn, vec![Modification::add(LEGACY_MEMBER, values)])
                        .await?;
                }
            }
            Some(existing) => {
                let stored = existing.attributes().first_u32(GID_NUMBER);
                let gid = keep_if_allocating(gid, stored);
                domain.check_id(gid)?;
                self.check_unique_id(
                    domain,
                    domain.group_base(),
                    Filter::group_class(),
                    GID_NUMBER,
                    gid,
                    Some(&dn),
                )
                .await?;
                let mods = vec![
                    Modification::replace(GID_NUMBER, vec![Value::from(gid)]),
                    Modification::replace(LEGACY_MEMBER, values),
                    self.touch(&existing),
                ];
                self.modify(&dn, mods).await?;
                debug!(domain = domain.name(), name, "Replaced group");
            }
        }
        Ok(())
    }

    /// Add `member` to the member names of `group`. Idempotent.
    pub async fn legacy_add_group_member(
        &self,
        domain: &Domain,
        group: &str,
        member: &str,
    ) -> Result<()> {
        domain.require_membership(MembershipMode::Legacy)?;
        let dn = domain.group_dn(group)?;
        let entry = self.get(&dn, &[]).await?.ok_or_else(|| IdentityError::NotFound {
            what: "group",
            name: group.to_string(),
        })?;
        if let Membership::Legacy(names) = Membership::from_entry(&entry, MembershipMode::Legacy)
            && names.iter().any(|n| n == member)
        {
            return Ok(());
        }
        let mods = vec![
            Modification::add(LEGACY_MEMBER, vec![Value::from(member)]),
            self.touch(&entry),
        ];
        self.modify(&dn, mods).await
    }

    /// Remove `member` from the member names of `group`. Not being a member is
    /// not an error.
    pub async fn legacy_remove_group_member(
        &self,
        domain: &Domain,
        group: &str,
        member: &str,
    ) -> Result<()> {
        domain.require_membership(MembershipMode::Legacy)?;
        let dn = domain.group_dn(group)?;
        let entry = self.get(&dn, &[]).await?.ok_or_else(|| IdentityError::NotFound {
            what: "group",
            name: group.to_string(),
        })?;
        let value = Value::from(member);
        if !entry.attributes().has_value(LEGACY_MEMBER, &value) {
            return Ok(());
        }
        let mods = vec![
            Modification::delete(LEGACY_MEMBER, vec![value]),
            self.touch(&entry),
        ];
        self.modify(&dn, mods).await
    }
}
