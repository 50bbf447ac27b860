pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;

use commands::lookup::LookupTarget;

#[derive(Debug, Parser)]
#[command(
    name = "orderdesk",
    about = "Orderdesk operator CLI",
    long_about = "Inspect orderdesk configuration, check runtime readiness, and run order lookups from a terminal.",
    after_help = "Examples:\n  orderdesk doctor --json\n  orderdesk config\n  orderdesk lookup --email cliente@exemplo.com"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and order API settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run an order lookup against the configured order API")]
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct LookupTargetArgs {
    #[arg(long, help = "Search purchases by customer e-mail")]
    email: Option<String>,
    #[arg(long, help = "Search purchases by external user id")]
    user: Option<String>,
    #[arg(long, help = "Fetch a single order by its id")]
    order: Option<String>,
}

#[derive(Debug, Args)]
struct LookupArgs {
    #[command(flatten)]
    target: LookupTargetArgs,
    #[arg(long, help = "Emit machine-readable JSON output")]
    json: bool,
}

impl LookupTargetArgs {
    fn into_target(self) -> Option<LookupTarget> {
        match (self.email, self.user, self.order) {
            (Some(email), _, _) => Some(LookupTarget::Email(email)),
            (None, Some(user), _) => Some(LookupTarget::User(user)),
            (None, None, Some(order)) => Some(LookupTarget::Order(order)),
            (None, None, None) => None,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::CommandResult::ok(commands::config::run()),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Lookup(args) => match args.target.into_target() {
            Some(target) => commands::lookup::run(target, args.json),
            None => commands::CommandResult::failure(
                "lookup",
                "usage",
                "one of --email, --user or --order is required",
                2,
            ),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
