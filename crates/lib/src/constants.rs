//! Constants used throughout the idcache library.
//!
//! Attribute names, container names and object classes that make up the
//! persisted layout of the cache. Changing any of these breaks existing cache
//! files.

/// Default storage file name under the configured database directory.
pub const DEFAULT_DB_FILE: &str = "cache.json";

/// Root container of every cache instance.
pub const SYSDB_BASE: &str = "cn=sysdb";

/// Relative name of the per-domain user container.
pub const USERS_CONTAINER: &str = "users";

/// Relative name of the per-domain group container.
pub const GROUPS_CONTAINER: &str = "groups";

/// Object class of user entries.
pub const USER_CLASS: &str = "user";

/// Object class of group entries.
pub const GROUP_CLASS: &str = "group";

pub const OBJECT_CLASS: &str = "objectClass";
pub const CN: &str = "cn";

/// Naming attribute of user and group entries.
pub const NAME: &str = "name";
pub const UID_NUMBER: &str = "uidNumber";
pub const GID_NUMBER: &str = "gidNumber";
/// Next id to hand out in a domain; kept on the domain entry.
pub const NEXT_ID: &str = "nextID";
pub const CREATE_TIME: &str = "createTimestamp";
pub const LAST_UPDATE: &str = "lastUpdate";

pub const PASSWORD: &str = "userPassword";
pub const FULLNAME: &str = "fullName";
pub const GECOS: &str = "gecos";
pub const HOMEDIR: &str = "homeDirectory";
pub const SHELL: &str = "loginShell";
pub const DISABLED: &str = "disabled";

/// Back-reference from a member to the groups it belongs to (native mode).
pub const MEMBEROF: &str = "memberOf";

/// Member DN references of a group (native mode).
pub const MEMBER: &str = "member";

/// Flat member names of a group (legacy mode).
pub const LEGACY_MEMBER: &str = "memberUid";

/// Attributes returned by user lookups.
pub const PW_ATTRS: &[&str] = &[
    NAME,
    UID_NUMBER,
    GID_NUMBER,
    FULLNAME,
    GECOS,
    HOMEDIR,
    SHELL,
    MEMBEROF,
    CREATE_TIME,
    LAST_UPDATE,
    OBJECT_CLASS,
];

/// Attributes returned by group lookups.
pub const GR_ATTRS: &[&str] = &[
    NAME,
    GID_NUMBER,
    MEMBER,
    LEGACY_MEMBER,
    CREATE_TIME,
    LAST_UPDATE,
    OBJECT_CLASS,
];
