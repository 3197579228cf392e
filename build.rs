// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    let pattern_modes = [
        Arg::new("all")
            .short('a')
            .long("all")
            .action(ArgAction::SetTrue)
            .help("Match every installed package"),
        Arg::new("glob")
            .short('g')
            .long("glob")
            .action(ArgAction::SetTrue)
            .help("Treat the pattern as a shell glob"),
        Arg::new("regex")
            .short('x')
            .long("regex")
            .action(ArgAction::SetTrue)
            .help("Treat the pattern as a basic regular expression"),
        Arg::new("eregex")
            .short('X')
            .long("eregex")
            .action(ArgAction::SetTrue)
            .help("Treat the pattern as an extended regular expression"),
    ];

    Command::new("stowage")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Stowage Contributors")
        .about("Package metadata catalog and manifest interpreter")
        .arg(
            Arg::new("db_path")
                .short('d')
                .long("db-path")
                .value_name("PATH")
                .global(true)
                .help("Catalog database path (defaults to $PKG_DBDIR/pkg.db)"),
        )
        .subcommand(Command::new("init").about("Create the package catalog if it does not exist yet"))
        .subcommand(
            Command::new("register")
                .about("Register a package manifest in the catalog")
                .arg(Arg::new("manifest").required(true).help("Path to the manifest file"))
                .arg(
                    Arg::new("automatic")
                        .long("automatic")
                        .action(ArgAction::SetTrue)
                        .help("Mark the package as installed automatically"),
                ),
        )
        .subcommand(
            Command::new("query")
                .about("List installed packages matching a pattern")
                .arg(Arg::new("pattern").help("Name pattern (exact match unless a mode flag is given)"))
                .args(pattern_modes),
        )
        .subcommand(
            Command::new("which")
                .about("Show which package owns an installed file")
                .arg(Arg::new("path").required(true).help("Absolute path of the installed file")),
        )
        .subcommand(
            Command::new("deps")
                .about("Show the packages a package depends on")
                .arg(Arg::new("name").required(true).help("Installed package name")),
        )
        .subcommand(
            Command::new("rdeps")
                .about("Show the packages that depend on a package")
                .arg(Arg::new("name").required(true).help("Installed package name")),
        )
        .subcommand(
            Command::new("files")
                .about("List the files installed by a package")
                .arg(Arg::new("name").required(true).help("Installed package name")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("stowage.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
