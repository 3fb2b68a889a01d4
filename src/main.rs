//! assetsync CLI entry point.

use assetsync::cli::commands;
use assetsync::cli::{Cli, Commands};
use assetsync::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.quiet {
        assetsync::QUIET.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,reqwest=info,hyper_util=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let project = cli.project.as_deref();
    let token = cli.token.as_deref();

    match &cli.command {
        Commands::Init {
            owner,
            repo,
            branch,
            force,
        } => commands::init::execute(owner, repo, branch, *force, project, json),
        Commands::Version => commands::version::execute(json),

        // Local state
        Commands::Status => commands::status::execute(project, json),
        Commands::Exclude { command } => commands::exclude::execute(command, project, json),
        Commands::History { limit } => commands::history::execute(*limit, project, json),

        // Remote
        Commands::Remote { path, git_ref } => {
            commands::remote::execute(path.as_deref(), git_ref.as_deref(), project, token, json)
        }
        Commands::Check { git_ref } => commands::check::execute(git_ref.as_deref(), project, token, json),
        Commands::Pull(args) => commands::pull::execute(args, project, token, json),
        Commands::Push(args) => commands::push::execute(args, project, token, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
