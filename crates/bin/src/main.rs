use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod context;
mod output;

use cli::{Cli, Commands, GroupCommand, MemberCommand, UserCommand};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("idcache=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);
    let (db, config) = context::open(&cli).await?;

    let result = match &cli.command {
        Commands::Info => commands::info::run(&db, &config, format).await,
        Commands::User(UserCommand::Add(args)) => commands::user::add(&db, args).await,
        Commands::User(UserCommand::Show(args)) => commands::user::show(&db, args, format).await,
        Commands::User(UserCommand::Del(args)) => commands::user::del(&db, args).await,
        Commands::Group(GroupCommand::Add(args)) => commands::group::add(&db, args).await,
        Commands::Group(GroupCommand::Show(args)) => {
            commands::group::show(&db, args, format).await
        }
        Commands::Group(GroupCommand::Del(args)) => commands::group::del(&db, args).await,
        Commands::Member(MemberCommand::Add(args)) => commands::member::add(&db, args).await,
        Commands::Member(MemberCommand::Remove(args)) => {
            commands::member::remove(&db, args).await
        }
        Commands::Initgroups(args) => commands::lookup::initgroups(&db, args, format).await,
        Commands::Enumerate(args) => commands::lookup::enumerate(&db, args, format).await,
    };

    db.shutdown().await;
    result
}
