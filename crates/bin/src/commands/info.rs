//! Cache info command - shows the cache file and per-domain counts.

use idcache::{Config, Filter, MembershipMode, Scope, SysDb, dn};

use crate::output::{OutputFormat, print_json, print_table};

fn mode_label(mode: MembershipMode) -> &'static str {
    match mode {
        MembershipMode::Native => "native",
        MembershipMode::Legacy => "legacy",
    }
}

/// Run the info command
pub async fn run(
    db: &SysDb,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = config.db_file_path();
    let entries = db
        .operation(|req| async move {
            let all = req
                .search(&dn::sysdb_dn(), Scope::Subtree, &Filter::everything(), &[])
                .await?;
            Ok(all.len())
        })
        .await?;

    let mut domains = Vec::with_capacity(db.domains().len());
    for domain in db.domains() {
        // Counts are only available where enumeration is allowed.
        let (users, groups) = if domain.enumerates() {
            (
                Some(db.enumerate_users(domain, None).await?.len()),
                Some(db.enumerate_groups(domain, None).await?.len()),
            )
        } else {
            (None, None)
        };
        domains.push((domain, users, groups));
    }

    match format {
        OutputFormat::Human => {
            println!("Cache file:  {}", file.display());
            println!("Entries:     {entries}");
            println!("Domains:     {}", domains.len());
            println!();
            let count = |n: Option<usize>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
            let rows: Vec<Vec<String>> = domains
                .iter()
                .map(|(domain, users, groups)| {
                    vec![
                        domain.name().to_string(),
                        mode_label(domain.membership()).to_string(),
                        if domain.is_mpg() { "yes" } else { "no" }.to_string(),
                        count(*users),
                        count(*groups),
                    ]
                })
                .collect();
            print_table(&["DOMAIN", "MEMBERSHIP", "MPG", "USERS", "GROUPS"], &rows);
        }
        OutputFormat::Json => {
            let domains: Vec<_> = domains
                .iter()
                .map(|(domain, users, groups)| {
                    serde_json::json!({
                        "name": domain.name(),
                        "membership": mode_label(domain.membership()),
                        "mpg": domain.is_mpg(),
                        "enumerate": domain.enumerates(),
                        "users": users,
                        "groups": groups,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "file": file.display().to_string(),
                "entries": entries,
                "domains": domains,
            }))?;
        }
    }

    Ok(())
}
