//! Identity mutations.
//!
//! Each verb is a sequence of storage calls on an active Transaction
//! [`Request`]; the queue commits them together or rolls all of them back.
//! Calling one through an Operation fails with `ReadOnly` on its first write.

use tracing::{debug, warn};

use super::{Domain, IdentityError};
use crate::Result;
use crate::attrs::{Attributes, Attrs, Value};
use crate::backend::{Modification, ModifyMode, Scope};
use crate::constants::{
    CN, CREATE_TIME, FULLNAME, GECOS, GID_NUMBER, GROUP_CLASS, HOMEDIR, LAST_UPDATE, MEMBER,
    MEMBEROF, NAME, NEXT_ID, OBJECT_CLASS, PASSWORD, SHELL, UID_NUMBER, USER_CLASS,
};
use crate::dn::Dn;
use crate::entry::{Entry, Member, Membership, MembershipMode};
use crate::filter::Filter;
use crate::queue::Request;

/// Id value asking `add_user` and `add_group` to allocate one.
pub const ALLOCATE_ID: u32 = 0;

/// Attributes of a user to create or store.
///
/// ```
/// use idcache::identity::UserRecord;
///
/// let alice = UserRecord::new("alice", 1000, 1000)
///     .gecos("Alice")
///     .home("/home/alice")
///     .shell("/bin/sh");
/// assert_eq!(alice.name, "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserRecord {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub fullname: Option<String>,
    pub gecos: Option<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
    pub password: Option<String>,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, uid: u32, gid: u32) -> Self {
        Self {
            name: name.into(),
            uid,
            gid,
            ..Default::default()
        }
    }

    pub fn fullname(mut self, fullname: impl Into<String>) -> Self {
        self.fullname = Some(fullname.into());
        self
    }

    pub fn gecos(mut self, gecos: impl Into<String>) -> Self {
        self.gecos = Some(gecos.into());
        self
    }

    pub fn home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Optional text attributes as `(name, value)`; absent ones carry `None`.
    pub(crate) fn optional_attrs(&self) -> [(&'static str, Option<&str>); 5] {
        [
            (FULLNAME, self.fullname.as_deref()),
            (GECOS, self.gecos.as_deref()),
            (HOMEDIR, self.home.as_deref()),
            (SHELL, self.shell.as_deref()),
            (PASSWORD, self.password.as_deref()),
        ]
    }
}

/// Attributes the cache maintains itself.
const PROTECTED: &[&str] = &[NAME, OBJECT_CLASS, CREATE_TIME, LAST_UPDATE, MEMBEROF];

/// Find `dn` in a list of stored DN values, returning the stored spelling.
fn stored_value(values: &[Value], dn: &Dn) -> Option<Value> {
    values
        .iter()
        .find(|v| v.as_str().and_then(|s| Dn::parse(s).ok()).as_ref() == Some(dn))
        .cloned()
}

impl Request {
    fn stamp(&self, attrs: &mut Attributes) {
        let now = self.clock().now_secs();
        attrs.set(CREATE_TIME, vec![Value::from(now)]);
        attrs.set(LAST_UPDATE, vec![Value::from(now)]);
    }

    pub(super) fn touch(&self, entry: &Entry) -> Modification {
        let previous = entry.attributes().first_i64(LAST_UPDATE);
        let next = self.clock().next_update(previous);
        Modification::replace(LAST_UPDATE, vec![Value::from(next)])
    }

    /// Fail with `DuplicateId` if an entry other than `except` under `base`
    /// matches `class` with `attr=id`.
    pub(super) async fn check_unique_id(
        &self,
        domain: &Domain,
        base: &Dn,
        class: Filter,
        attr: &'static str,
        id: u32,
        except: Option<&Dn>,
    ) -> Result<()> {
        let filter = Filter::and([class, Filter::eq(attr, id)]);
        let holders = self
            .search_or_empty(base, Scope::OneLevel, &filter, &[NAME])
            .await?;
        if holders.iter().any(|entry| Some(entry.dn()) != except) {
            return Err(IdentityError::DuplicateId {
                domain: domain.name().to_string(),
                what: if attr == UID_NUMBER { "uid" } else { "gid" },
                id,
            }
            .into());
        }
        Ok(())
    }

    /// Hand out the next id of `domain` that no user or group holds.
    ///
    /// The counter lives in the domain entry's `nextID` and starts at the
    /// domain's `min_id` (1 without one). It only moves forward.
    pub async fn allocate_id(&self, domain: &Domain) -> Result<u32> {
        let entry = self.require_entry(domain.dn(), "domain").await?;
        let (min, max) = domain.id_range();
        let floor = min.unwrap_or(1).max(1);
        let stored = entry.attributes().first_u32(NEXT_ID);
        let mut candidate = stored.unwrap_or(floor).max(floor);

        loop {
            let exhausted = || IdentityError::IdRangeExhausted {
                domain: domain.name().to_string(),
                max: max.unwrap_or(u32::MAX),
            };
            if max.is_some_and(|max| candidate > max) {
                return Err(exhausted().into());
            }
            let holders = Filter::or([
                Filter::eq(UID_NUMBER, candidate),
                Filter::eq(GID_NUMBER, candidate),
            ]);
            let taken = self
                .search_or_empty(domain.dn(), Scope::Subtree, &holders, &[NAME])
                .await?;
            if taken.is_empty() {
                break;
            }
            candidate = candidate.checked_add(1).ok_or_else(exhausted)?;
        }

        let next = candidate.saturating_add(1);
        self.modify(
            domain.dn(),
            vec![Modification::replace(NEXT_ID, vec![Value::from(next)])],
        )
        .await?;
        debug!(domain = domain.name(), id = candidate, "Allocated id");
        Ok(candidate)
    }

    async fn require_entry(&self, dn: &Dn, what: &'static str) -> Result<Entry> {
        self.get(dn, &[]).await?.ok_or_else(|| {
            IdentityError::NotFound {
                what,
                name: dn.rdn_value().unwrap_or_else(|| dn.to_string()),
            }
            .into()
        })
    }

    /// Create a user entry.
    ///
    /// A uid of [`ALLOCATE_ID`] takes the domain's next free id. In an `mpg`
    /// domain a gid of [`ALLOCATE_ID`] is set to the uid.
    pub async fn add_user(&self, domain: &Domain, user: &UserRecord) -> Result<()> {
        let dn = domain.user_dn(&user.name)?;
        let gid_follows_uid = user.gid == ALLOCATE_ID && domain.is_mpg();
        if user.uid != ALLOCATE_ID {
            domain.check_id(user.uid)?;
        }
        if !gid_follows_uid {
            domain.check_id(user.gid)?;
        }
        if self.get(&dn, &[NAME]).await?.is_some() {
            return Err(IdentityError::AlreadyExists {
                what: "user",
                name: user.name.clone(),
            }
            .into());
        }

        let uid = if user.uid == ALLOCATE_ID {
            self.allocate_id(domain).await?
        } else {
            self.check_unique_id(
                domain,
                domain.user_base(),
                Filter::user_class(),
                UID_NUMBER,
                user.uid,
                None,
            )
            .await?;
            user.uid
        };
        let gid = if gid_follows_uid { uid } else { user.gid };

        let mut attrs = Attributes::new();
        attrs.append(OBJECT_CLASS, Value::from(USER_CLASS));
        attrs.append(NAME, Value::from(&user.name));
        attrs.append(UID_NUMBER, Value::from(uid));
        attrs.append(GID_NUMBER, Value::from(gid));
        for (name, value) in user.optional_attrs() {
            if let Some(value) = value {
                attrs.append(name, Value::from(value));
            }
        }
        self.stamp(&mut attrs);
        self.add(Entry::with_attributes(dn, attrs)).await?;
        debug!(domain = domain.name(), name = %user.name, uid, "Added user");
        Ok(())
    }

    /// Create a group entry. A gid of [`ALLOCATE_ID`] takes the domain's next
    /// free id.
    pub async fn add_group(&self, domain: &Domain, name: &str, gid: u32) -> Result<()> {
        if gid != ALLOCATE_ID {
            domain.check_id(gid)?;
        }
        let dn = domain.group_dn(name)?;
        if self.get(&dn, &[NAME]).await?.is_some() {
            return Err(IdentityError::AlreadyExists {
                what: "group",
                name: name.to_string(),
            }
            .into());
        }
        let gid = if gid == ALLOCATE_ID {
            self.allocate_id(domain).await?
        } else {
            self.check_unique_id(
                domain,
                domain.group_base(),
                Filter::group_class(),
                GID_NUMBER,
                gid,
                None,
            )
            .await?;
            gid
        };

        let mut attrs = Attributes::new();
        attrs.append(OBJECT_CLASS, Value::from(GROUP_CLASS));
        attrs.append(NAME, Value::from(name));
        attrs.append(GID_NUMBER, Value::from(gid));
        self.stamp(&mut attrs);
        self.add(Entry::with_attributes(dn, attrs)).await?;
        debug!(domain = domain.name(), name, gid, "Added group");
        Ok(())
    }

    /// Replace the staged attributes of user `name`.
    ///
    /// Ids are range- and uniqueness-checked; the naming attribute and the
    /// attributes the cache maintains are refused.
    pub async fn set_user_attr(&self, domain: &Domain, name: &str, attrs: Attrs) -> Result<()> {
        if attrs.is_empty() {
            return Err(IdentityError::EmptyAttrs.into());
        }
        if let Some((attribute, _)) = attrs
            .iter()
            .find(|(attr, _)| PROTECTED.iter().any(|p| p.eq_ignore_ascii_case(attr)))
        {
            return Err(IdentityError::ProtectedAttribute {
                attribute: attribute.to_string(),
            }
            .into());
        }

        let dn = domain.user_dn(name)?;
        let entry = self.require_entry(&dn, "user").await?;

        for (attr, unique) in [(UID_NUMBER, true), (GID_NUMBER, false)] {
            for value in attrs.get(attr).unwrap_or_default() {
                let id = value.as_u32().ok_or_else(|| -> crate::Error {
                    crate::backend::BackendError::InvalidAttributeSyntax {
                        attribute: attr.to_string(),
                        reason: "not a valid id".to_string(),
                    }
                    .into()
                })?;
                domain.check_id(id)?;
                if unique {
                    self.check_unique_id(
                        domain,
                        domain.user_base(),
                        Filter::user_class(),
                        UID_NUMBER,
                        id,
                        Some(&dn),
                    )
                    .await?;
                }
            }
        }

        let mut mods = Modification::from_attrs(ModifyMode::Replace, attrs);
        mods.push(self.touch(&entry));
        self.modify(&dn, mods).await
    }

    /// Change the gid of group `name`.
    pub async fn set_group_gid(&self, domain: &Domain, name: &str, gid: u32) -> Result<()> {
        domain.check_id(gid)?;
        let dn = domain.group_dn(name)?;
        let entry = self.require_entry(&dn, "group").await?;
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
            self.touch(&entry),
        ];
        self.modify(&dn, mods).await
    }

    /// Delete the user holding `uid`. No such user is not an error.
    ///
    /// In a native domain the user is first removed from every group listing
    /// it as a member.
    pub async fn delete_user_by_uid(&self, domain: &Domain, uid: u32) -> Result<()> {
        let filter = Filter::and([Filter::user_class(), Filter::eq(UID_NUMBER, uid)]);
        let mut found = self
            .search_or_empty(domain.user_base(), Scope::OneLevel, &filter, &[NAME])
            .await?;
        let dn = match found.len() {
            0 => {
                debug!(domain = domain.name(), uid, "No user to delete");
                return Ok(());
            }
            1 => found.remove(0).dn().clone(),
            _ => return Err(IdentityError::Ambiguous { what: "user", id: uid }.into()),
        };

        if domain.membership() == MembershipMode::Native {
            self.drop_member_references(domain, &dn).await?;
        }
        self.delete(&dn).await?;
        debug!(domain = domain.name(), %dn, "Deleted user");
        Ok(())
    }

    /// Delete the group holding `gid`. No such group is not an error.
    ///
    /// In a native domain the `memberOf` back-references of its members and
    /// its own membership in other groups are removed first.
    pub async fn delete_group_by_gid(&self, domain: &Domain, gid: u32) -> Result<()> {
        let filter = Filter::and([Filter::group_class(), Filter::eq(GID_NUMBER, gid)]);
        let mut found = self
            .search_or_empty(domain.group_base(), Scope::OneLevel, &filter, &[])
            .await?;
        let group = match found.len() {
            0 => {
                debug!(domain = domain.name(), gid, "No group to delete");
                return Ok(());
            }
            1 => found.remove(0),
            _ => return Err(IdentityError::Ambiguous { what: "group", id: gid }.into()),
        };
        let dn = group.dn().clone();

        if domain.membership() == MembershipMode::Native {
            if let Membership::Native(members) =
                Membership::from_entry(&group, MembershipMode::Native)
            {
                for member in members {
                    self.drop_member_of(&member, &dn).await?;
                }
            }
            self.drop_member_references(domain, &dn).await?;
        }
        self.delete(&dn).await?;
        debug!(domain = domain.name(), %dn, "Deleted group");
        Ok(())
    }

    /// Remove `dn` from the `member` list of every group in `domain`.
    async fn drop_member_references(&self, domain: &Domain, dn: &Dn) -> Result<()> {
        let filter = Filter::and([Filter::group_class(), Filter::eq(MEMBER, dn)]);
        let groups = self
            .search_or_empty(domain.group_base(), Scope::OneLevel, &filter, &[])
            .await?;
        for group in groups {
            let values = group.attributes().get(MEMBER).unwrap_or_default();
            if let Some(value) = stored_value(values, dn) {
                let mods = vec![Modification::delete(MEMBER, vec![value]), self.touch(&group)];
                self.modify(group.dn(), mods).await?;
            }
        }
        Ok(())
    }

    /// Remove the `memberOf` reference to `group` from `member`, if both exist.
    async fn drop_member_of(&self, member: &Dn, group: &Dn) -> Result<()> {
        let Some(entry) = self.get(member, &[MEMBEROF, LAST_UPDATE]).await? else {
            warn!(%member, %group, "Group lists a member that no longer exists");
            return Ok(());
        };
        let values = entry.attributes().get(MEMBEROF).unwrap_or_default();
        if let Some(value) = stored_value(values, group) {
            let mods = vec![Modification::delete(MEMBEROF, vec![value]), self.touch(&entry)];
            self.modify(member, mods).await?;
        }
        Ok(())
    }

    /// Make `member` a member of `group`. Already being a member is not an
    /// error.
    ///
    /// The representation follows the domain: a `member` reference plus the
    /// member's `memberOf` back-reference in a native domain, a `memberUid`
    /// name in a legacy one.
    pub async fn add_group_member(&self, domain: &Domain, member: &Dn, group: &Dn) -> Result<()> {
        let mode = domain.membership();
        let group_entry = self.require_entry(group, "group").await?;
        let member_entry = self.require_entry(member, "member").await?;
        let candidate = Member::from_dn(member.clone());

        let mut members = Membership::from_entry(&group_entry, mode);
        if members.add(&candidate) {
            let mods = vec![
                Modification::add(mode.attribute(), vec![candidate.value(mode)]),
                self.touch(&group_entry),
            ];
            self.modify(group, mods).await?;
        } else {
            debug!(%member, %group, "Already a member");
        }

        if mode == MembershipMode::Native {
            let back_refs = member_entry.attributes().get(MEMBEROF).unwrap_or_default();
            if stored_value(back_refs, group).is_none() {
                let mods = vec![
                    Modification::add(MEMBEROF, vec![Value::from(group)]),
                    self.touch(&member_entry),
                ];
                self.modify(member, mods).await?;
            }
        }
        Ok(())
    }

    /// Remove `member` from `group`. Not being a member is not an error.
    pub async fn remove_group_member(
        &self,
        domain: &Domain,
        member: &Dn,
        group: &Dn,
    ) -> Result<()> {
        let mode = domain.membership();
        let group_entry = self.require_entry(group, "group").await?;
        let candidate = Member::from_dn(member.clone());

        let stored = group_entry
            .attributes()
            .get(mode.attribute())
            .unwrap_or_default();
        let value = match mode {
            MembershipMode::Native => stored_value(stored, member),
            MembershipMode::Legacy => {
                let value = candidate.value(mode);
                stored.contains(&value).then_some(value)
            }
        };
        match value {
            Some(value) => {
                let mods = vec![
                    Modification::delete(mode.attribute(), vec![value]),
                    self.touch(&group_entry),
                ];
                self.modify(group, mods).await?;
            }
            None => debug!(%member, %group, "Not a member"),
        }

        if mode == MembershipMode::Native {
            self.drop_member_of(member, group).await?;
        }
        Ok(())
    }

    /// Delete the entry at `dn` without touching references to it.
    pub async fn delete_entry(&self, dn: &Dn) -> Result<()> {
        self.delete(dn).await
    }

    /// Create the root, domain and container entries that do not exist yet.
    pub(crate) async fn ensure_containers(&self, domain: &Domain) -> Result<()> {
        for dn in [
            crate::dn::sysdb_dn(),
            domain.dn().clone(),
            domain.user_base().clone(),
            domain.group_base().clone(),
        ] {
            if self.get(&dn, &[]).await?.is_some() {
                continue;
            }
            let mut attrs = Attributes::new();
            if let Some(value) = dn.rdn_value() {
                attrs.append(CN, Value::from(value));
            }
            if &dn == domain.dn() {
                let (min, _) = domain.id_range();
                attrs.append(NEXT_ID, Value::from(min.unwrap_or(1).max(1)));
            }
            self.add(Entry::with_attributes(dn, attrs)).await?;
        }
        Ok(())
    }
}
