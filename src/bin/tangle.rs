//! Command-line interface for tangle
//! This binary converts annotated notebooks or source files into plain,
//! importable module text.
//!
//! Usage:
//!   tangle convert `<path>` [--mode `<mode>`] [-o `<out>`]  - Transform a notebook or source file
//!   tangle tags `<path>`                                  - Show the tag recognized for each line
//!   tangle find `<name>`                                  - Locate the notebook file for a module name

use clap::{Arg, Command};
use std::path::{Path, PathBuf};

use tangle::notebook;
use tangle::tangle::filter::Mode;
use tangle::tangle::tags::{Recognition, Recognizer, Tag};

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new("tangle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for tangling annotated notebooks into importable module text")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("convert")
                .about("Transform a notebook (.ipynb) or annotated source file")
                .arg(
                    Arg::new("path")
                        .help("Path to the notebook or source file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .short('m')
                        .help("Output mode: 'module' or 'interactive'")
                        .default_value("module"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Write the result to this file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("tags")
                .about("Show the tag recognized for each input line")
                .arg(
                    Arg::new("path")
                        .help("Path to the annotated source file")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("find")
                .about("Locate the notebook file for a module-style name")
                .arg(
                    Arg::new("name")
                        .help("Module name (underscores also match '-' and ' ' in filenames)")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("convert", convert_matches)) => {
            let path = convert_matches.get_one::<String>("path").unwrap();
            let mode = parse_mode(convert_matches.get_one::<String>("mode").unwrap());
            let output = convert_matches.get_one::<String>("output");
            handle_convert_command(path, mode, output.map(String::as_str));
        }
        Some(("tags", tags_matches)) => {
            let path = tags_matches.get_one::<String>("path").unwrap();
            handle_tags_command(path);
        }
        Some(("find", find_matches)) => {
            let name = find_matches.get_one::<String>("name").unwrap();
            handle_find_command(name);
        }
        _ => unreachable!(),
    }
}

fn parse_mode(mode: &str) -> Mode {
    match mode {
        "module" => Mode::Module,
        "interactive" => Mode::Interactive,
        other => {
            eprintln!("Unknown mode '{other}' (expected 'module' or 'interactive')");
            std::process::exit(1);
        }
    }
}

/// Handle the convert command
fn handle_convert_command(path: &str, mode: Mode, output: Option<&str>) {
    let path = Path::new(path);
    let text = if path.extension().is_some_and(|ext| ext == "ipynb") {
        let cells = notebook::read_notebook(path).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
        notebook::tangle_cells(&cells, mode)
    } else {
        let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading file: {e}");
            std::process::exit(1);
        });
        notebook::tangle_source(&source, mode)
    };

    match output {
        Some(out_path) => {
            if let Err(e) = std::fs::write(out_path, text + "\n") {
                eprintln!("Error writing output: {e}");
                std::process::exit(1);
            }
        }
        None => println!("{text}"),
    }
}

/// Handle the tags command
fn handle_tags_command(path: &str) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file: {e}");
        std::process::exit(1);
    });

    let mut recognizer = Recognizer::new();
    for line in source.lines() {
        match recognizer.recognize(line) {
            Recognition::Line(tagged) => {
                println!(
                    "{:>4} {:<14} {}",
                    recognizer.meta().line_no,
                    tagged.tag.to_string(),
                    tagged.text
                );
            }
            Recognition::Raw(text) => {
                println!(
                    "{:>4} {:<14} {}",
                    recognizer.meta().line_no,
                    Tag::Code.to_string(),
                    text
                );
            }
            Recognition::Dropped => {
                println!("{:>4} {:<14} {}", recognizer.meta().line_no, "(dropped)", line);
            }
        }
    }
}

/// Handle the find command
fn handle_find_command(name: &str) {
    let search_paths: Vec<PathBuf> = vec![PathBuf::from(".")];
    match notebook::find_notebook(name, &search_paths) {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("No notebook found for '{name}'");
            std::process::exit(1);
        }
    }
}
