//! Output formatting helpers for human-readable and JSON output.

use idcache::{Group, Membership, User};
use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Print `value` as a single JSON line.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let format_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", format_line(headers.to_vec()));
    for row in rows {
        println!(
            "{}",
            format_line(row.iter().take(col_count).map(String::as_str).collect())
        );
    }
}

/// Member names of a group, comma separated.
pub fn member_list(members: &Membership) -> String {
    members.names().join(",")
}

pub fn user_row(user: &User) -> Vec<String> {
    vec![
        user.name.clone(),
        user.uid.to_string(),
        user.gid.to_string(),
        user.home.clone().unwrap_or_default(),
        user.shell.clone().unwrap_or_default(),
    ]
}

pub const USER_HEADERS: &[&str] = &["NAME", "UID", "GID", "HOME", "SHELL"];

pub fn group_row(group: &Group) -> Vec<String> {
    vec![
        group.name.clone(),
        group.gid.to_string(),
        member_list(&group.members),
    ]
}

pub const GROUP_HEADERS: &[&str] = &["NAME", "GID", "MEMBERS"];
