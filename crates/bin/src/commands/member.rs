//! Group membership commands.

use idcache::{MembershipMode, SysDb};

use crate::cli::MemberArgs;

/// Run the `member add` command
pub async fn add(db: &SysDb, args: &MemberArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    match domain.membership() {
        MembershipMode::Native => {
            let group = domain.group_dn(&args.group)?;
            let member = member_dn(domain, args)?;
            db.add_group_member(domain, &member, &group).await?;
        }
        MembershipMode::Legacy => {
            db.legacy_add_group_member(domain, &args.group, &args.member)
                .await?;
        }
    }
    Ok(())
}

/// Run the `member remove` command
pub async fn remove(db: &SysDb, args: &MemberArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    match domain.membership() {
        MembershipMode::Native => {
            let group = domain.group_dn(&args.group)?;
            let member = member_dn(domain, args)?;
            db.remove_group_member(domain, &member, &group).await?;
        }
        MembershipMode::Legacy => {
            db.legacy_remove_group_member(domain, &args.group, &args.member)
                .await?;
        }
    }
    Ok(())
}

fn member_dn(domain: &idcache::Domain, args: &MemberArgs) -> idcache::Result<idcache::Dn> {
    if args.nested {
        domain.group_dn(&args.member)
    } else {
        domain.user_dn(&args.member)
    }
}
