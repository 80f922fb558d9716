//! satchel CLI - manage content-addressed file packages

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use satchel::Package;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "content-addressed file packager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// add files or directories to a package
    Add {
        /// package file to create or update
        #[arg(short, long)]
        package: PathBuf,

        /// files and directories to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// list file entries in a package
    List {
        /// package file to read
        #[arg(short, long)]
        package: PathBuf,
    },

    /// extract every entry of a package into a directory
    Install {
        /// package file to read
        #[arg(short, long)]
        package: PathBuf,

        /// destination directory
        destination: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SATCHEL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> satchel::Result<()> {
    match cli.command {
        Commands::Add { package, paths } => {
            let mut package = Package::open(&package)?;
            package.register_paths(&paths, None)?;
        }

        Commands::List { package } => {
            let package = Package::open(&package)?;
            for (name, hash) in package.list_files()? {
                println!("{} {}", hash, name);
            }
        }

        Commands::Install {
            package,
            destination,
        } => {
            let package = Package::open(&package)?;
            package.install(&destination, None)?;
        }
    }
    Ok(())
}
