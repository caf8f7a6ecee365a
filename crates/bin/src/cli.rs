//! CLI argument definitions for the idcache binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Administer a local identity cache
#[derive(Parser, Debug)]
#[command(name = "idcache")]
#[command(about = "idcache: inspect and edit the local user and group cache")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML). Without one, a single native domain
    /// called LOCAL is served.
    #[arg(short, long, env = "IDCACHE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the cache file. Overrides `db_path` from the config.
    #[arg(short = 'D', long, env = "IDCACHE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the cache file and configured domains
    Info,
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage group membership
    #[command(subcommand)]
    Member(MemberCommand),
    /// List the groups a user belongs to
    Initgroups(InitgroupsArgs),
    /// List every user or group of a domain
    Enumerate(EnumerateArgs),
}

/// Domain selector shared by most commands
#[derive(clap::Args, Debug)]
pub struct DomainArg {
    /// Domain to operate on
    #[arg(short, long, default_value = "LOCAL")]
    pub domain: String,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Add a user (or store it wholesale in a legacy domain)
    Add(UserAddArgs),
    /// Show a user by name or uid
    Show(UserShowArgs),
    /// Delete the user holding a uid
    Del(UserDelArgs),
}

#[derive(clap::Args, Debug)]
pub struct UserAddArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub name: String,
    /// 0 takes the next free id of the domain
    #[arg(long, default_value_t = 0)]
    pub uid: u32,
    /// 0 takes the next free id in merged domains
    #[arg(long, default_value_t = 0)]
    pub gid: u32,
    #[arg(long)]
    pub fullname: Option<String>,
    #[arg(long)]
    pub gecos: Option<String>,
    #[arg(long)]
    pub home: Option<String>,
    #[arg(long)]
    pub shell: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UserShowArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    /// User name, or a uid when numeric
    pub user: String,
}

#[derive(clap::Args, Debug)]
pub struct UserDelArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub uid: u32,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add a group (or store it wholesale in a legacy domain)
    Add(GroupAddArgs),
    /// Show a group by name or gid
    Show(GroupShowArgs),
    /// Delete the group holding a gid
    Del(GroupDelArgs),
}

#[derive(clap::Args, Debug)]
pub struct GroupAddArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub name: String,
    /// 0 takes the next free id of the domain
    #[arg(long, default_value_t = 0)]
    pub gid: u32,
    /// Member names, legacy domains only
    #[arg(long = "member")]
    pub members: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct GroupShowArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    /// Group name, or a gid when numeric
    pub group: String,
}

#[derive(clap::Args, Debug)]
pub struct GroupDelArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub gid: u32,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Add a member to a group
    Add(MemberArgs),
    /// Remove a member from a group
    Remove(MemberArgs),
}

#[derive(clap::Args, Debug)]
pub struct MemberArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub group: String,
    pub member: String,
    /// The member is a group, not a user
    #[arg(long)]
    pub nested: bool,
}

#[derive(clap::Args, Debug)]
pub struct InitgroupsArgs {
    pub domain: String,
    pub user: String,
}

/// What to enumerate
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EnumerateKind {
    Users,
    Groups,
}

#[derive(clap::Args, Debug)]
pub struct EnumerateArgs {
    #[command(flatten)]
    pub domain: DomainArg,
    pub kind: EnumerateKind,
    /// Only names matching this pattern (`*` wildcards)
    #[arg(long)]
    pub name: Option<String>,
}
