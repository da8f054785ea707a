//! sheetlisp - reactive spreadsheet cells with Lisp formulas

mod config;
mod error;
mod repl;

use anyhow::Context;
use sheetlisp_core::Sheet;
use sheetlisp_engine::engine::{create_engine, format_result};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;

fn print_usage() {
    eprintln!("Usage: sheetlisp [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <EXPR>      Evaluate an expression and print the result");
    eprintln!("  -s, --set <KEY=EXPR>      Define a cell before running (can be repeated)");
    eprintln!("  -g, --get <KEY|RANGE>     Print a cell value, or one line per cell of a range");
    eprintln!("  -l, --lib <FILE>          Load a library file (can be repeated)");
    eprintln!("  --config <FILE>           Read configuration from FILE");
    eprintln!("  --no-default-prelude      Do not load default.lisp from the config dir");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Without -c or -g an interactive prompt is started.");
}

fn init_logging(config: &Config) {
    let default_level = config.log_level.as_deref().unwrap_or("warn");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_libraries(sheet: &mut Sheet, files: &[PathBuf]) -> anyhow::Result<()> {
    for path in files {
        sheet
            .load_library_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut command: Option<String> = None;
    let mut assignments: Vec<String> = Vec::new();
    let mut get_key: Option<String> = None;
    let mut lib_files: Vec<PathBuf> = Vec::new();
    let mut config_file: Option<PathBuf> = None;
    let mut no_default_prelude = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-c" | "--command" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --command requires an expression");
                    std::process::exit(1);
                }
                command = Some(args[i].to_string());
            }
            "-s" | "--set" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --set requires KEY=EXPR");
                    std::process::exit(1);
                }
                assignments.push(args[i].to_string());
            }
            "-g" | "--get" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --get requires a cell or range");
                    std::process::exit(1);
                }
                get_key = Some(args[i].to_string());
            }
            "-l" | "--lib" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --lib requires a file path");
                    std::process::exit(1);
                }
                lib_files.push(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                config_file = Some(PathBuf::from(&args[i]));
            }
            "--no-default-prelude" => no_default_prelude = true,
            arg => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match &config_file {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);
    debug!(?config, "configuration loaded");

    let parser_options = match config.parser_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let engine = create_engine()
        .with_parser_options(parser_options)
        .with_options(config.eval_options());
    let mut sheet = Sheet::with_engine(engine);

    let mut libraries = config.prelude_files(!no_default_prelude);
    libraries.extend(lib_files);
    if let Err(e) = load_libraries(&mut sheet, &libraries) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    for assignment in &assignments {
        let Some((key, source)) = assignment.split_once('=') else {
            eprintln!("Error: --set expects KEY=EXPR, got {}", assignment);
            std::process::exit(1);
        };
        let source = source.trim();
        if let Err(e) = sheet.set(key, (!source.is_empty()).then_some(source)) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(key) = &get_key {
        println!("{}", repl::get(&sheet, key.trim()));
    }

    if let Some(expr) = &command {
        let result = sheet.evaluate(expr);
        println!("{}", format_result(&result));
        if result.is_err() {
            std::process::exit(1);
        }
    }

    if command.is_none() && get_key.is_none() {
        if let Err(e) = repl::run(&sheet) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
