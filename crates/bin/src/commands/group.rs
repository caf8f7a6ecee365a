//! Group management commands.

use idcache::{Group, MembershipMode, SysDb};

use crate::cli::{GroupAddArgs, GroupDelArgs, GroupShowArgs};
use crate::output::{GROUP_HEADERS, OutputFormat, group_row, print_json, print_table};

/// Run the `group add` command
pub async fn add(db: &SysDb, args: &GroupAddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    match domain.membership() {
        MembershipMode::Native => {
            if !args.members.is_empty() {
                return Err("--member is only accepted for legacy domains; use `member add`".into());
            }
            db.add_group(domain, &args.name, args.gid).await?;
        }
        MembershipMode::Legacy => {
            let members: Vec<&str> = args.members.iter().map(String::as_str).collect();
            db.legacy_store_group(domain, &args.name, args.gid, &members)
                .await?;
        }
    }
    tracing::info!(domain = domain.name(), name = %args.name, "Stored group");
    Ok(())
}

/// Run the `group show` command
pub async fn show(
    db: &SysDb,
    args: &GroupShowArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    let groups = match args.group.parse::<u32>() {
        Ok(gid) => db.get_group_by_id(domain, gid).await?,
        Err(_) => db.get_group_by_name(domain, &args.group).await?,
    };
    if groups.is_empty() {
        return Err(format!("No group {} in domain {}", args.group, domain.name()).into());
    }
    print_groups(&groups, format)?;
    Ok(())
}

/// Run the `group del` command
pub async fn del(db: &SysDb, args: &GroupDelArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    db.delete_group_by_gid(domain, args.gid).await?;
    Ok(())
}

/// Print groups as a table or a JSON array.
pub fn print_groups(groups: &[Group], format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => {
            let rows: Vec<_> = groups.iter().map(group_row).collect();
            print_table(GROUP_HEADERS, &rows);
            Ok(())
        }
        OutputFormat::Json => print_json(groups),
    }
}
