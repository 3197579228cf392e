// src/main.rs

use anyhow::{Context as _, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use stowage::db::{Catalog, MatchMode, catalog_path};
use stowage::manifest;
use stowage::{Error, db};
use tracing::debug;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(author, version, about = "Package metadata catalog and manifest interpreter", long_about = None)]
struct Cli {
    /// Catalog database path (defaults to $PKG_DBDIR/pkg.db)
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the package catalog if it does not exist yet
    Init,
    /// Register a package manifest in the catalog
    Register {
        /// Path to the manifest file
        manifest: PathBuf,
        /// Mark the package as installed automatically (as a dependency)
        #[arg(long)]
        automatic: bool,
    },
    /// List installed packages matching a pattern
    Query {
        /// Name pattern (exact match unless a mode flag is given)
        pattern: Option<String>,
        /// Match every installed package
        #[arg(short, long)]
        all: bool,
        /// Treat the pattern as a shell glob
        #[arg(short, long)]
        glob: bool,
        /// Treat the pattern as a basic regular expression
        #[arg(short = 'x', long)]
        regex: bool,
        /// Treat the pattern as an extended regular expression
        #[arg(short = 'X', long)]
        eregex: bool,
    },
    /// Show which package owns an installed file
    Which {
        /// Absolute path of the installed file
        path: String,
    },
    /// Show the packages a package depends on
    Deps {
        /// Installed package name
        name: String,
    },
    /// Show the packages that depend on a package
    Rdeps {
        /// Installed package name
        name: String,
    },
    /// List the files installed by a package
    Files {
        /// Installed package name
        name: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = cli.db_path.unwrap_or_else(catalog_path);

    match cli.command {
        Commands::Init => {
            let catalog = Catalog::open(&db_path)?;
            catalog.close()?;
            println!("Catalog ready at {}", db_path.display());
            Ok(())
        }

        Commands::Register {
            manifest: manifest_path,
            automatic,
        } => {
            let text = std::fs::read_to_string(&manifest_path)
                .with_context(|| format!("failed to read {}", manifest_path.display()))?;
            let parsed = manifest::parse(&text)
                .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

            let mut catalog = Catalog::open(&db_path)?;
            catalog.add_package(&parsed, automatic)?;
            println!(
                "Registered {} {}",
                parsed.origin.as_deref().unwrap_or("?"),
                parsed.version.as_deref().unwrap_or("?")
            );
            Ok(())
        }

        Commands::Query {
            pattern,
            all,
            glob,
            regex,
            eregex,
        } => {
            let mode = if all {
                MatchMode::All
            } else if glob {
                MatchMode::Glob
            } else if regex {
                MatchMode::Regex
            } else if eregex {
                MatchMode::ERegex
            } else {
                MatchMode::Exact
            };

            let catalog = Catalog::open(&db_path)?;
            for pkg in catalog.query(pattern.as_deref(), mode)? {
                print_package_line(&pkg);
            }
            Ok(())
        }

        Commands::Which { path } => {
            let catalog = Catalog::open(&db_path)?;
            match catalog.which(&path) {
                Ok(pkg) => {
                    println!(
                        "{} was installed by package {}",
                        path,
                        label(&pkg)
                    );
                    Ok(())
                }
                Err(Error::NotFound(_)) => bail!("{} is not owned by any package", path),
                Err(e) => Err(e.into()),
            }
        }

        Commands::Deps { name } => {
            let catalog = Catalog::open(&db_path)?;
            let pkg = find_package(&catalog, &name)?;
            for dep in catalog.deps(&pkg)? {
                print_package_line(&dep);
            }
            Ok(())
        }

        Commands::Rdeps { name } => {
            let catalog = Catalog::open(&db_path)?;
            let pkg = find_package(&catalog, &name)?;
            for rdep in catalog.rdeps(&pkg)? {
                print_package_line(&rdep);
            }
            Ok(())
        }

        Commands::Files { name } => {
            let catalog = Catalog::open(&db_path)?;
            let pkg = find_package(&catalog, &name)?;
            for file in catalog.files(&pkg)? {
                println!("{}", file.path);
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Look up one installed package by exact name.
fn find_package(catalog: &Catalog, name: &str) -> Result<stowage::db::models::Package> {
    debug!("looking up package {}", name);
    catalog
        .query(Some(name), MatchMode::Exact)?
        .next()
        .with_context(|| format!("package '{name}' is not installed"))
}

fn label(pkg: &db::models::Package) -> String {
    format!(
        "{}-{}",
        pkg.name.as_deref().unwrap_or(&pkg.origin),
        pkg.version.as_deref().unwrap_or("?")
    )
}

fn print_package_line(pkg: &db::models::Package) {
    println!("{:<30} {}", label(pkg), pkg.comment.as_deref().unwrap_or(""));
}
