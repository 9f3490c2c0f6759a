use addonctl::commands::{self, Operation, config::Config};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// addonctl - package lifecycle manager
///
/// Install, activate, deactivate, uninstall and delete packages found under
/// `<root>/packages`, checking their declared requirements first.
///
/// Examples:
///   addonctl install blog            # Install the "blog" package
///   addonctl activate shop/invoices  # Activate the "invoices" plugin of "shop"
#[derive(Parser, Debug)]
#[command(author, version = env!("ADDONCTL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (defaults to ~/.addonctl; also via ADDONCTL_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "ADDONCTL_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Host version requirements are checked against (overrides addonctl.yml)
    #[arg(
        long = "host-version",
        env = "ADDONCTL_HOST_VERSION",
        value_name = "VERSION",
        global = true
    )]
    pub host_version: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a package or plugin
    Install(InstallArgs),

    /// Uninstall a package or plugin
    Uninstall(PackageArgs),

    /// Activate an installed package or plugin
    Activate(PackageArgs),

    /// Deactivate a package or plugin
    Deactivate(PackageArgs),

    /// Uninstall a package or plugin and remove its directory
    Delete(PackageArgs),

    /// Move a package one position earlier in the load order
    MoveUp(PackageArgs),

    /// Move a package one position later in the load order
    MoveDown(PackageArgs),

    /// List available packages and their state
    List,

    /// Synchronise the registry with the packages directory
    Sync,

    /// Read or write registry properties (used by lifecycle scripts)
    #[command(subcommand)]
    Registry(RegistryCommands),
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Package name, or "package/plugin"
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package name, or "package/plugin"
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Skip the install.sql data script
    #[arg(long)]
    pub no_dump: bool,
}

#[derive(clap::Subcommand, Debug)]
enum RegistryCommands {
    /// Print a property as JSON
    Get {
        #[arg(value_name = "NAME")]
        name: String,
        key: String,
    },
    /// Set a property; the value is parsed as JSON, falling back to a string
    Set {
        #[arg(value_name = "NAME")]
        name: String,
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(
        addonctl::runtime::RealRuntime,
        cli.install_root,
        cli.host_version,
    )?;

    let (name, operation) = match cli.command {
        Commands::Install(args) => (
            args.name,
            Operation::Install {
                install_dump: !args.no_dump,
            },
        ),
        Commands::Uninstall(args) => (args.name, Operation::Uninstall),
        Commands::Activate(args) => (args.name, Operation::Activate),
        Commands::Deactivate(args) => (args.name, Operation::Deactivate),
        Commands::Delete(args) => (args.name, Operation::Delete),
        Commands::MoveUp(args) => (args.name, Operation::MoveUp),
        Commands::MoveDown(args) => (args.name, Operation::MoveDown),
        Commands::List => return commands::list(&config),
        Commands::Sync => return commands::sync(&config),
        Commands::Registry(RegistryCommands::Get { name, key }) => {
            return commands::registry_get(&config, &name, &key);
        }
        Commands::Registry(RegistryCommands::Set { name, key, value }) => {
            return commands::registry_set(&config, &name, &key, &value);
        }
    };

    commands::run(&config, &name, operation).await
}
