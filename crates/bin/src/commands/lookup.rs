//! Read-only lookups: initgroups and enumeration.

use idcache::{Filter, SysDb};

use super::group::print_groups;
use super::user::print_users;
use crate::cli::{EnumerateArgs, EnumerateKind, InitgroupsArgs};
use crate::output::{OutputFormat, print_json};

/// Run the `initgroups` command
pub async fn initgroups(
    db: &SysDb,
    args: &InitgroupsArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain)?;
    let Some(result) = db.get_initgroups_for_user(domain, &args.user).await? else {
        return Err(format!("No user {} in domain {}", args.user, domain.name()).into());
    };

    match format {
        OutputFormat::Human => {
            let gids: Vec<String> = result.gids().iter().map(u32::to_string).collect();
            println!("{} : {}", result.user.name, gids.join(" "));
        }
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(())
}

/// Run the `enumerate` command
pub async fn enumerate(
    db: &SysDb,
    args: &EnumerateArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    if !domain.enumerates() {
        tracing::warn!(domain = domain.name(), "Enumeration is disabled for this domain");
    }
    let filter = args.name.as_deref().map(|pattern| Filter::wildcard("name", pattern));

    match args.kind {
        EnumerateKind::Users => print_users(&db.enumerate_users(domain, filter).await?, format)?,
        EnumerateKind::Groups => {
            print_groups(&db.enumerate_groups(domain, filter).await?, format)?
        }
    }
    Ok(())
}
