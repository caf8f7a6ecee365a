//! User management commands.

use idcache::{MembershipMode, SysDb, User, UserRecord};

use crate::cli::{UserAddArgs, UserDelArgs, UserShowArgs};
use crate::output::{OutputFormat, USER_HEADERS, print_json, print_table, user_row};

/// Run the `user add` command
pub async fn add(db: &SysDb, args: &UserAddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    let mut record = UserRecord::new(&args.name, args.uid, args.gid);
    record.fullname = args.fullname.clone();
    record.gecos = args.gecos.clone();
    record.home = args.home.clone();
    record.shell = args.shell.clone();

    match domain.membership() {
        MembershipMode::Native => db.add_user(domain, record).await?,
        MembershipMode::Legacy => db.legacy_store_user(domain, record).await?,
    }
    tracing::info!(domain = domain.name(), name = %args.name, "Stored user");
    Ok(())
}

/// Run the `user show` command
pub async fn show(
    db: &SysDb,
    args: &UserShowArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    let users = match args.user.parse::<u32>() {
        Ok(uid) => db.get_user_by_id(domain, uid).await?,
        Err(_) => db.get_user_by_name(domain, &args.user).await?,
    };
    if users.is_empty() {
        return Err(format!("No user {} in domain {}", args.user, domain.name()).into());
    }

    match format {
        OutputFormat::Human => {
            for user in &users {
                print_user(user);
            }
        }
        OutputFormat::Json => print_json(&users)?,
    }
    Ok(())
}

fn print_user(user: &User) {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    println!("Name:        {}", user.name);
    println!("DN:          {}", user.dn);
    println!("UID:         {}", user.uid);
    println!("GID:         {}", user.gid);
    println!("Full name:   {}", text(&user.fullname));
    println!("GECOS:       {}", text(&user.gecos));
    println!("Home:        {}", text(&user.home));
    println!("Shell:       {}", text(&user.shell));
    for group in &user.member_of {
        println!("Member of:   {group}");
    }
    if let Some(updated) = user.last_update {
        println!("Updated:     {updated}");
    }
}

/// Run the `user del` command
pub async fn del(db: &SysDb, args: &UserDelArgs) -> Result<(), Box<dyn std::error::Error>> {
    let domain = db.domain(&args.domain.domain)?;
    db.delete_user_by_uid(domain, args.uid).await?;
    Ok(())
}

/// Print users as a table or a JSON array.
pub fn print_users(users: &[User], format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => {
            let rows: Vec<_> = users.iter().map(user_row).collect();
            print_table(USER_HEADERS, &rows);
            Ok(())
        }
        OutputFormat::Json => print_json(users),
    }
}
