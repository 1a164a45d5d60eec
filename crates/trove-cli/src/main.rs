//! Trove CLI - federated package repositories

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod environment;
mod error;
mod exit_codes;

use environment::{Environment, Locations};

#[derive(Parser)]
#[command(name = "trove")]
#[command(author = "Trove Contributors")]
#[command(version)]
#[command(about = "Federated package repositories with dependency propagation", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    locations: LocationArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Args)]
struct LocationArgs {
    /// Directory holding remotes.yaml
    #[arg(long, global = true, env = "TROVE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Per-user package repository
    #[arg(long, global = true, env = "TROVE_SYSTEM_REPOSITORY")]
    system_repository: Option<PathBuf>,

    /// Project package repository (anchored)
    #[arg(long, global = true, env = "TROVE_PROJECT_REPOSITORY")]
    project_repository: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage remote repositories
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },

    /// List packages of a repository
    List {
        /// Repository directory (default: the system repository)
        #[arg(long)]
        repository: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish an archive to the first publishing remote
    Publish {
        /// Archive file (<name>-<version>.trove)
        archive: PathBuf,

        /// Remote name or repository locator to publish to first
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Resolve dependencies and copy them toward the project
    Sync {
        /// Dependencies, e.g. "nunit >= 2.5 and < 3.0"
        #[arg(required = true)]
        dependencies: Vec<String>,

        /// Remote name or repository locator to fetch from first
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Remove all but the latest version of each package
    Clean {
        /// Repository directory (default: the system repository)
        #[arg(long)]
        repository: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List remotes in fetch order
    List {
        /// Remote name or repository locator to list first
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Add a remote
    Add {
        /// Remote name
        name: String,

        /// Directory path or file:// URL
        locator: String,

        /// Lower values are fetched first (default: after existing remotes)
        #[arg(long)]
        priority: Option<i32>,

        /// Username for authenticated repositories
        #[arg(long)]
        username: Option<String>,

        /// Password for authenticated repositories
        #[arg(long)]
        password: Option<String>,

        /// Only fetch from this remote
        #[arg(long)]
        no_publish: bool,
    },

    /// Remove a remote
    Remove {
        /// Remote name
        name: String,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            code
        }
    };

    std::process::exit(code);
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    let locations = Locations {
        config_dir: cli.locations.config_dir,
        system_repository: cli.locations.system_repository,
        project_repository: cli.locations.project_repository,
    };
    let env = Environment::new(&locations)?;

    match cli.command {
        Commands::Remote { command } => match command {
            RemoteCommands::List { remote } => commands::remote::list(&env, remote.as_deref()),
            RemoteCommands::Add {
                name,
                locator,
                priority,
                username,
                password,
                no_publish,
            } => commands::remote::add(
                &env,
                &name,
                &locator,
                priority,
                username.as_deref(),
                password.as_deref(),
                no_publish,
            ),
            RemoteCommands::Remove { name } => commands::remote::remove(&env, &name),
        },

        Commands::List { repository, json } => {
            commands::list::run(&env, repository.as_deref(), json)
        }

        Commands::Publish { archive, remote } => {
            commands::publish::run(&env, &archive, remote.as_deref())
        }

        Commands::Sync {
            dependencies,
            remote,
        } => commands::sync::run(&env, &dependencies, remote.as_deref()),

        Commands::Clean { repository } => commands::clean::run(&env, repository.as_deref()),
    }
}
