use clap::{Parser, Subcommand};
use git_dashboard::commands::*;
use git_dashboard::core::{
    error::{DashboardError, Result},
    print_error, print_warning,
};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-dashboard")]
#[command(about = "An interactive, line-addressable git dashboard")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print every external git invocation when done
    #[arg(long, global = true)]
    trace_commands: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Dashboard,
    /// Print the numbered dashboard once
    Status,
    /// Run an action on dashboard lines
    Act {
        /// Action to run
        #[arg(value_enum)]
        kind: ActKind,
        /// Line numbers (e.g., "1 3-5,8")
        #[arg(required = true)]
        lines: Vec<String>,
        /// Answer yes to confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },
    /// Show conflicting files and files that would conflict with the tracking branch
    Conflicts,
    /// Show or set the tracking branch
    Tracking {
        /// Local branch to compare against
        branch: Option<String>,
    },
    /// Commit staged changes
    Commit {
        #[arg(short, long)]
        message: String,
    },
    /// Fetch and fast-forward from upstream
    Pull,
    /// Push the current branch, setting its upstream if needed
    Push,
    /// Squash the current branch into the tracking branch
    SquashMerge {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn report(error: &DashboardError) {
    if error.is_warning() {
        print_warning(&error.to_string());
    } else {
        print_error(&error.to_string());
    }
}

fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let options = GlobalOptions {
        config: cli.config,
        trace_commands: cli.trace_commands,
    };

    let result: Result<()> = match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => execute_dashboard(&options),
        Commands::Status => execute_status(&options),
        Commands::Act { kind, lines, yes } => execute_act(&options, kind, lines, yes),
        Commands::Conflicts => execute_conflicts(&options),
        Commands::Tracking { branch } => execute_tracking(&options, branch),
        Commands::Commit { message } => execute_commit(&options, &message),
        Commands::Pull => execute_pull(&options),
        Commands::Push => execute_push(&options),
        Commands::SquashMerge { yes } => execute_squash_merge(&options, yes),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}
