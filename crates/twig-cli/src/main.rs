//! twig CLI: the command-line interface to twig.

use std::fmt::Write as _;
use std::process;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use twig_core::commit::Commit;
use twig_core::status::{Modification, WorkspaceStatus};
use twig_core::{Config, Repository, TwigResult};

/// Environment variable holding the log filter (`warn` when unset).
const LOG_ENV: &str = "TWIG_LOG";

/// Exit status for user errors.
const EXIT_USER: i32 = 1;
/// Exit status for a broken environment.
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "twig", about = "twig: local-first version control", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new repository in the current directory.
    Init,

    /// Stage a file for the next commit.
    Add { file: String },

    /// Record the staged changes.
    Commit { message: Option<String> },

    /// Unstage a file, and stop tracking it.
    Rm { file: String },

    /// Show the history of the current branch.
    Log,

    /// Show every commit ever made.
    GlobalLog,

    /// Print the ids of all commits with the given message.
    Find { message: String },

    /// Show branches, staged changes and working tree changes.
    Status,

    /// Switch branches, or restore a file from HEAD or a commit.
    ///
    /// `checkout <branch>`, `checkout -- <file>`, `checkout <commit> -- <file>`
    Checkout {
        target: Option<String>,
        #[arg(last = true)]
        file: Option<String>,
    },

    /// Create a branch at the current commit.
    Branch { name: String },

    /// Delete a branch pointer.
    RmBranch { name: String },

    /// Move the current branch to a commit and check it out.
    Reset { commit: String },

    /// Merge a branch into the current branch.
    Merge { branch: String },

    /// Register a remote repository.
    AddRemote { name: String, dir: String },

    /// Forget a remote repository.
    RmRemote { name: String },

    /// Send a branch to a remote.
    Push { remote: String, branch: String },

    /// Copy a remote branch into `<remote>/<branch>`.
    Fetch { remote: String, branch: String },

    /// Fetch a remote branch and merge it.
    Pull { remote: String, branch: String },
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => usage_error(err),
    };
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("fatal: cannot determine current directory: {e}");
        process::exit(EXIT_FATAL);
    });

    if let Err(e) = run(cli.command, &config) {
        if e.is_fatal() {
            eprintln!("fatal: {e}");
            process::exit(EXIT_FATAL);
        }
        println!("{e}");
        process::exit(EXIT_USER);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The one-line message for an argument-parsing failure.
fn usage_message(kind: ClapErrorKind) -> &'static str {
    match kind {
        ClapErrorKind::MissingSubcommand
        | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => "Please enter a command.",
        ClapErrorKind::InvalidSubcommand => "No command with that name exists.",
        _ => "Incorrect operands.",
    }
}

fn usage_error(err: clap::Error) -> ! {
    if matches!(
        err.kind(),
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
    ) {
        err.exit();
    }
    println!("{}", usage_message(err.kind()));
    process::exit(EXIT_USER);
}

fn run(command: Commands, config: &Config) -> TwigResult<()> {
    if let Commands::Init = command {
        Repository::init(config)?;
        return Ok(());
    }

    let repo = Repository::open(config)?;
    match command {
        Commands::Init => {}
        Commands::Add { file } => repo.add(&file)?,
        Commands::Commit { message } => {
            let commit = repo.commit(message.as_deref().unwrap_or(""))?;
            debug!(id = %commit.id, "created commit");
        }
        Commands::Rm { file } => repo.rm(&file)?,
        Commands::Log => print!("{}", format_log(&repo.log()?)),
        Commands::GlobalLog => print!("{}", format_log(&repo.global_log()?)),
        Commands::Find { message } => {
            for id in repo.find(&message)? {
                println!("{id}");
            }
        }
        Commands::Status => print!("{}", format_status(&repo.status()?)),
        Commands::Checkout { target, file } => cmd_checkout(&repo, target, file)?,
        Commands::Branch { name } => repo.branch(&name)?,
        Commands::RmBranch { name } => repo.rm_branch(&name)?,
        Commands::Reset { commit } => repo.reset(&commit)?,
        Commands::Merge { branch } => {
            if let Some(notice) = repo.merge(&branch)?.notice() {
                println!("{notice}");
            }
        }
        Commands::AddRemote { name, dir } => repo.add_remote(&name, &dir)?,
        Commands::RmRemote { name } => repo.rm_remote(&name)?,
        Commands::Push { remote, branch } => {
            let result = repo.push(&remote, &branch)?;
            debug!(commits = result.commits_pushed, "push complete");
        }
        Commands::Fetch { remote, branch } => {
            let result = repo.fetch(&remote, &branch)?;
            debug!(commits = result.commits_fetched, "fetch complete");
        }
        Commands::Pull { remote, branch } => {
            if let Some(notice) = repo.pull(&remote, &branch)?.merge.notice() {
                println!("{notice}");
            }
        }
    }
    Ok(())
}

fn cmd_checkout(
    repo: &Repository,
    target: Option<String>,
    file: Option<String>,
) -> TwigResult<()> {
    match (target, file) {
        (Some(branch), None) => repo.checkout_branch(&branch),
        (None, Some(file)) => repo.checkout_file(&file),
        (Some(commit), Some(file)) => repo.checkout_commit_file(&commit, &file),
        (None, None) => {
            println!("{}", usage_message(ClapErrorKind::WrongNumberOfValues));
            process::exit(EXIT_USER);
        }
    }
}

fn format_commit(out: &mut String, commit: &Commit) {
    let _ = writeln!(out, "===");
    let _ = writeln!(out, "commit {}", commit.id);
    if let (Some(first), Some(second)) = (&commit.parent, &commit.second_parent) {
        let _ = writeln!(out, "Merge: {first} {second}");
    }
    let _ = writeln!(out, "Date: {}", commit.timestamp);
    let _ = writeln!(out, "{}", commit.message);
    let _ = writeln!(out);
}

fn format_log(commits: &[Commit]) -> String {
    let mut out = String::new();
    for commit in commits {
        format_commit(&mut out, commit);
    }
    out
}

fn format_status(status: &WorkspaceStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Branches ===");
    for name in &status.branches {
        let marker = if *name == status.current_branch { "*" } else { "" };
        let _ = writeln!(out, "{marker}{name}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== Staged Files ===");
    for name in &status.staged {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== Removed Files ===");
    for name in &status.removed {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== Modifications Not Staged For Commit ===");
    for change in &status.modified {
        let kind = match change.kind {
            Modification::Modified => "modified",
            Modification::Deleted => "deleted",
        };
        let _ = writeln!(out, "{} ({kind})", change.path);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== Untracked Files ===");
    for name in &status.untracked {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(out);
    out
}
