//! # Lumen
//!
//! This binary is the command-line front-end for Lumen. It ties the module loader and REPL
//! together behind a handful of subcommands.

mod cli;

use cli::*;

use std::fs;
use std::path::Path;

use log::error;
use lumen::loader::ModuleLoader;

fn main() {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).expect("failed to initialize logger");

    let exit_code = match args.command {
        Commands::Run(run_args) => run(&run_args.file),
        Commands::Repl => {
            lumen::repl::run();
            0
        }
        Commands::Version => {
            println!("lumen {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::About => {
            println!("{}", env!("CARGO_PKG_DESCRIPTION"));
            0
        }
    };

    std::process::exit(exit_code);
}

/// Runs a single source file (§6 "lumen run"). The file is resolved relative to its own directory
/// so `use` statements inside it resolve sibling modules the same way the loader resolves them
/// for any other module.
fn run(path: &Path) -> i32 {
    let file = match fs::canonicalize(path) {
        Ok(file) => file,
        Err(e) => {
            error!("cannot open `{}`: {e}", path.display());
            return 1;
        }
    };

    let base_dir = file.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let name = match file.file_stem().and_then(|s| s.to_str()) {
        Some(name) => name.to_string(),
        None => {
            error!("`{}` has no file name", file.display());
            return 1;
        }
    };

    let loader = ModuleLoader::new(base_dir);
    match loader.load(&name) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
