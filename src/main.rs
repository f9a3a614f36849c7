//! CLI tool to validate and inspect sdevice command files.

use std::fs;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("Usage: sdevice <command> [files...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  validate  Report syntax errors in command file(s)");
        eprintln!("  tree      Print the syntax tree of command file(s)");
        eprintln!("  check     Verify lossless parsing and reparse consistency");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  sdevice validate sdevice_des.cmd");
        eprintln!("  RUST_LOG=sdevice_syntax=debug sdevice tree sdevice_des.cmd");
        return ExitCode::from(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = args[1].as_str();
    let files = &args[2..];

    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        let tree = match sdevice_syntax::parse(&content) {
            Ok(tree) => tree,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        match command {
            "validate" => {
                let diagnostics = sdevice_syntax::diagnostics(&tree);
                if diagnostics.is_empty() {
                    let statements = tree.root().child_nodes().count();
                    eprintln!("{path}: valid ({statements} statement(s))");
                } else {
                    for d in &diagnostics {
                        eprintln!("{path}:{d}");
                    }
                    had_error = true;
                }
            }
            "tree" => print!("{}", sdevice_syntax::to_indented(&tree)),
            "check" => {
                if tree.source_text() != content {
                    eprintln!("{path}: tokens do not reproduce the source");
                    had_error = true;
                    continue;
                }
                match sdevice_syntax::reparse(&tree, &[], &content) {
                    Ok(again) if again == tree => eprintln!("{path}: ok"),
                    Ok(_) => {
                        eprintln!("{path}: reparse differs from parse");
                        had_error = true;
                    }
                    Err(e) => {
                        eprintln!("{path}: {e}");
                        had_error = true;
                    }
                }
            }
            _ => {
                eprintln!("Unknown command: {command}");
                return ExitCode::from(2);
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
