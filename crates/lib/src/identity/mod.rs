//! Identity operations over the cache.
//!
//! [`SysDb`] is the cache context: it owns the request queue and the
//! configured [`Domain`]s. Each verb on it submits one unit to the queue and
//! resolves when that unit completes. Lookups run as Operations and
//! mutations as Transactions, so every mutation either applies completely or
//! not at all.
//!
//! The same verbs exist on [`Request`](crate::Request). Calling them inside a
//! transaction body composes several verbs into one atomic unit:
//!
//! ```
//! # use idcache::{SysDb, Domain, InMemory, SystemClock};
//! # use idcache::identity::UserRecord;
//! # use std::sync::Arc;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> idcache::Result<()> {
//! let local = Domain::new("LOCAL")?;
//! let db = SysDb::with_backend(
//!     Arc::new(InMemory::new()),
//!     vec![local.clone()],
//!     Arc::new(SystemClock),
//! )
//! .await?;
//!
//! let domain = local.clone();
//! db.transaction(move |req| async move {
//!     req.add_group(&domain, "staff", 5000).await?;
//!     req.add_user(&domain, &UserRecord::new("alice", 1000, 5000)).await?;
//!     let alice = domain.user_dn("alice")?;
//!     let staff = domain.group_dn("staff")?;
//!     req.add_group_member(&domain, &alice, &staff).await
//! })
//! .await?;
//!
//! let initgroups = db.get_initgroups_for_user(&local, "alice").await?.unwrap();
//! assert_eq!(initgroups.gids(), vec![5000]);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use handle_trait::Handle;
use tracing::info;

use crate::Result;
use crate::attrs::Attrs;
use crate::backend::database::InMemory;
use crate::backend::{Directory, DirectoryBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dn::Dn;
use crate::entry::{Entry, Group, User};
use crate::filter::Filter;
use crate::queue::{Request, RequestQueue};

mod domain;
pub mod errors;
mod legacy;
mod lookup;
mod ops;

pub use domain::Domain;
pub use errors::IdentityError;
pub use lookup::Initgroups;
pub use ops::{ALLOCATE_ID, UserRecord};

/// The cache context.
#[derive(Clone, Debug, Handle)]
pub struct SysDb {
    inner: Arc<SysDbInner>,
}

#[derive(Debug)]
struct SysDbInner {
    queue: RequestQueue,
    domains: Vec<Domain>,
}

impl SysDb {
    /// Open the cache described by `config`, creating its storage directory
    /// and file as needed.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.db_path).await?;
        let backend = InMemory::open(config.db_file_path()).await?;
        Self::with_backend(
            Arc::new(backend),
            config.to_domains()?,
            Arc::new(SystemClock),
        )
        .await
    }

    /// Build a cache over an existing engine.
    ///
    /// The root, domain and container entries missing from the engine are
    /// created in a single transaction before this returns.
    pub async fn with_backend(
        backend: Arc<dyn DirectoryBackend>,
        domains: Vec<Domain>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        for (i, domain) in domains.iter().enumerate() {
            let repeated = domains[..i]
                .iter()
                .any(|other| other.name().eq_ignore_ascii_case(domain.name()));
            if repeated {
                return Err(IdentityError::DuplicateDomain {
                    name: domain.name().to_string(),
                }
                .into());
            }
        }

        let queue = RequestQueue::new(Directory::new(backend), clock);
        let setup = domains.clone();
        queue
            .submit_transaction(move |req| async move {
                for domain in &setup {
                    req.ensure_containers(domain).await?;
                }
                Ok(())
            })
            .await?;
        info!(domains = domains.len(), "Cache opened");

        Ok(Self {
            inner: Arc::new(SysDbInner { queue, domains }),
        })
    }

    /// The configured domain called `name`.
    pub fn domain(&self, name: &str) -> Result<&Domain> {
        self.inner
            .domains
            .iter()
            .find(|domain| domain.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                IdentityError::UnknownDomain {
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub fn domains(&self) -> &[Domain] {
        &self.inner.domains
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.inner.queue
    }

    /// Wait for every submitted unit to complete.
    pub async fn shutdown(&self) {
        self.inner.queue.wait_idle().await;
        info!("Cache drained");
    }

    /// Owned copy of `domain`, refusing domains this cache was not built with.
    fn registered(&self, domain: &Domain) -> Result<Domain> {
        let known = self.domain(domain.name())?;
        if known != domain {
            return Err(IdentityError::UnknownDomain {
                name: domain.name().to_string(),
            }
            .into());
        }
        Ok(known.clone())
    }

    /// Run `body` as a read-only unit.
    pub async fn operation<F, Fut, T>(&self, body: F) -> Result<T>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.queue.submit_operation(body).await
    }

    /// Run `body` as one atomic unit.
    pub async fn transaction<F, Fut, T>(&self, body: F) -> Result<T>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.queue.submit_transaction(body).await
    }

    pub async fn get_user_by_name(&self, domain: &Domain, name: &str) -> Result<Vec<User>> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.operation(move |req| async move { req.get_user_by_name(&domain, &name).await })
            .await
    }

    pub async fn get_user_by_id(&self, domain: &Domain, uid: u32) -> Result<Vec<User>> {
        let domain = self.registered(domain)?;
        self.operation(move |req| async move { req.get_user_by_id(&domain, uid).await })
            .await
    }

    pub async fn enumerate_users(
        &self,
        domain: &Domain,
        extra: Option<Filter>,
    ) -> Result<Vec<User>> {
        let domain = self.registered(domain)?;
        self.operation(move |req| async move { req.enumerate_users(&domain, extra).await })
            .await
    }

    pub async fn get_group_by_name(&self, domain: &Domain, name: &str) -> Result<Vec<Group>> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.operation(move |req| async move { req.get_group_by_name(&domain, &name).await })
            .await
    }

    pub async fn get_group_by_id(&self, domain: &Domain, gid: u32) -> Result<Vec<Group>> {
        let domain = self.registered(domain)?;
        self.operation(move |req| async move { req.get_group_by_id(&domain, gid).await })
            .await
    }

    pub async fn enumerate_groups(
        &self,
        domain: &Domain,
        extra: Option<Filter>,
    ) -> Result<Vec<Group>> {
        let domain = self.registered(domain)?;
        self.operation(move |req| async move { req.enumerate_groups(&domain, extra).await })
            .await
    }

    pub async fn get_initgroups_for_user(
        &self,
        domain: &Domain,
        name: &str,
    ) -> Result<Option<Initgroups>> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.operation(move |req| async move { req.get_initgroups_for_user(&domain, &name).await })
            .await
    }

    pub async fn get_user_attr(
        &self,
        domain: &Domain,
        name: &str,
        attrs: &[&str],
    ) -> Result<Vec<Entry>> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        let attrs: Vec<String> = attrs.iter().map(|a| a.to_string()).collect();
        self.operation(move |req| async move {
            let attrs: Vec<&str> = attrs.iter().map(String::as_str).collect();
            req.get_user_attr(&domain, &name, &attrs).await
        })
        .await
    }

    pub async fn add_user(&self, domain: &Domain, user: UserRecord) -> Result<()> {
        let domain = self.registered(domain)?;
        self.transaction(move |req| async move { req.add_user(&domain, &user).await })
            .await
    }

    pub async fn add_group(&self, domain: &Domain, name: &str, gid: u32) -> Result<()> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.transaction(move |req| async move { req.add_group(&domain, &name, gid).await })
            .await
    }

    pub async fn set_user_attr(&self, domain: &Domain, name: &str, attrs: Attrs) -> Result<()> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.transaction(move |req| async move { req.set_user_attr(&domain, &name, attrs).await })
            .await
    }

    pub async fn set_group_gid(&self, domain: &Domain, name: &str, gid: u32) -> Result<()> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        self.transaction(move |req| async move { req.set_group_gid(&domain, &name, gid).await })
            .await
    }

    pub async fn delete_user_by_uid(&self, domain: &Domain, uid: u32) -> Result<()> {
        let domain = self.registered(domain)?;
        self.transaction(move |req| async move { req.delete_user_by_uid(&domain, uid).await })
            .await
    }

    pub async fn delete_group_by_gid(&self, domain: &Domain, gid: u32) -> Result<()> {
        let domain = self.registered(domain)?;
        self.transaction(move |req| async move { req.delete_group_by_gid(&domain, gid).await })
            .await
    }

    pub async fn add_group_member(&self, domain: &Domain, member: &Dn, group: &Dn) -> Result<()> {
        let domain = self.registered(domain)?;
        let (member, group) = (member.clone(), group.clone());
        self.transaction(move |req| async move {
            req.add_group_member(&domain, &member, &group).await
        })
        .await
    }

    pub async fn remove_group_member(
        &self,
        domain: &Domain,
        member: &Dn,
        group: &Dn,
    ) -> Result<()> {
        let domain = self.registered(domain)?;
        let (member, group) = (member.clone(), group.clone());
        self.transaction(move |req| async move {
            req.remove_group_member(&domain, &member, &group).await
        })
        .await
    }

    pub async fn delete_entry(&self, dn: &Dn) -> Result<()> {
        let dn = dn.clone();
        self.transaction(move |req| async move { req.delete_entry(&dn).await })
            .await
    }

    pub async fn legacy_store_user(&self, domain: &Domain, user: UserRecord) -> Result<()> {
        let domain = self.registered(domain)?;
        self.transaction(move |req| async move { req.legacy_store_user(&domain, &user).await })
            .await
    }

    pub async fn legacy_store_group(
        &self,
        domain: &Domain,
        name: &str,
        gid: u32,
        members: &[&str],
    ) -> Result<()> {
        let (domain, name) = (self.registered(domain)?, name.to_string());
        let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        self.transaction(move |req| async move {
            let members: Vec<&str> = members.iter().map(String::as_str).collect();
            req.legacy_store_group(&domain, &name, gid, &members).await
        })
        .await
    }

    pub async fn legacy_add_group_member(
        &self,
        domain: &Domain,
        group: &str,
        member: &str,
    ) -> Result<()> {
        let domain = self.registered(domain)?;
        let (group, member) = (group.to_string(), member.to_string());
        self.transaction(move |req| async move {
            req.legacy_add_group_member(&domain, &group, &member).await
        })
        .await
    }

    pub async fn legacy_remove_group_member(
        &self,
        domain: &Domain,
        group: &str,
        member: &str,
    ) -> Result<()> {
        let domain = self.registered(domain)?;
        let (group, member) = (group.to_string(), member.to_string());
        self.transaction(move |req| async move {
            req.legacy_remove_group_member(&domain, &group, &member).await
        })
        .await
    }
}
