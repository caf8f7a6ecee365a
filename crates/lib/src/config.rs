//! Cache configuration.
//!
//! A [`Config`] names the storage directory and file and lists the identity
//! domains served by the cache. It is usually read from a TOML file:
//!
//! ```toml
//! db_path = "/var/lib/idcache"
//!
//! [[domains]]
//! name = "LOCAL"
//! membership = "native"
//! min_id = 1000
//!
//! [[domains]]
//! name = "PROXY"
//! membership = "legacy"
//! enumerate = false
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Result;
use crate::constants::DEFAULT_DB_FILE;
use crate::entry::MembershipMode;
use crate::identity::Domain;

/// Errors raised while loading or validating configuration.
///
/// All variants translate to [`ErrorKind::InvalidArgument`](crate::ErrorKind).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No domains configured")]
    NoDomains,

    #[error("Domain {name} configured twice")]
    DuplicateDomain { name: String },

    #[error("Domain {name}: min_id {min} is greater than max_id {max}")]
    InvalidIdRange { name: String, min: u32, max: u32 },

    #[error("Domain name {name:?} cannot be used in an address")]
    InvalidDomainName { name: String },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

fn default_db_file() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_true() -> bool {
    true
}

/// One configured identity domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    #[serde(default)]
    pub membership: MembershipMode,
    /// User entries double as their own private groups.
    #[serde(default)]
    pub mpg: bool,
    #[serde(default = "default_true")]
    pub enumerate: bool,
    #[serde(default)]
    pub min_id: Option<u32>,
    #[serde(default)]
    pub max_id: Option<u32>,
}

impl DomainConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            membership: MembershipMode::default(),
            mpg: false,
            enumerate: true,
            min_id: None,
            max_id: None,
        }
    }

    pub fn to_domain(&self) -> Result<Domain> {
        let domain = Domain::new(&self.name).map_err(|_| ConfigError::InvalidDomainName {
            name: self.name.clone(),
        })?;
        Ok(domain
            .with_membership(self.membership)
            .with_mpg(self.mpg)
            .with_enumerate(self.enumerate)
            .with_id_range(self.min_id, self.max_id))
    }
}

/// Top-level cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the storage file.
    pub db_path: PathBuf,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            db_file: default_db_file(),
            domains: Vec::new(),
        }
    }

    pub fn with_domain(mut self, domain: DomainConfig) -> Self {
        self.domains.push(domain);
        self
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|source| {
            ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Read, parse and validate the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check domain names and id ranges.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(ConfigError::NoDomains.into());
        }
        let mut seen = HashSet::new();
        for domain in &self.domains {
            if !seen.insert(domain.name.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateDomain {
                    name: domain.name.clone(),
                }
                .into());
            }
            if let (Some(min), Some(max)) = (domain.min_id, domain.max_id)
                && min > max
            {
                return Err(ConfigError::InvalidIdRange {
                    name: domain.name.clone(),
                    min,
                    max,
                }
                .into());
            }
            domain.to_domain()?;
        }
        Ok(())
    }

    /// Full path of the storage file.
    pub fn db_file_path(&self) -> PathBuf {
        self.db_path.join(&self.db_file)
    }

    pub fn to_domains(&self) -> Result<Vec<Domain>> {
        self.domains.iter().map(DomainConfig::to_domain).collect()
    }
}
