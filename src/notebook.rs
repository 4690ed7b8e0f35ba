//! Notebook reading and materialization
//!
//! The cell source provider side of the pipeline: reads `.ipynb` v4 JSON
//! into ordered cell batches, feeds code cells through a [`Pipeline`], and
//! forwards text cells as comment lines so they survive as documentation
//! without affecting tag state.

use crate::tangle::filter::Mode;
use crate::tangle::pipeline::{collapse_blank_lines, Pipeline};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors from reading a notebook file.
#[derive(Debug)]
pub enum NotebookError {
    Io(std::io::Error),
    Malformed(serde_json::Error),
    UnsupportedVersion { found: u64 },
}

impl fmt::Display for NotebookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reading notebook: {err}"),
            Self::Malformed(err) => write!(f, "notebook is not valid JSON: {err}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported notebook format version: {found} (expected 4)")
            }
        }
    }
}

impl std::error::Error for NotebookError {}

impl From<std::io::Error> for NotebookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for NotebookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err)
    }
}

/// What a cell contributes to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Code,
    Text,
}

/// One ordered batch of source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub lines: Vec<String>,
}

#[derive(Deserialize)]
struct RawNotebook {
    #[serde(default)]
    nbformat: Option<u64>,
    cells: Vec<RawCell>,
}

#[derive(Deserialize)]
struct RawCell {
    cell_type: String,
    source: RawSource,
}

/// Notebook JSON stores cell sources either as one joined string or as a
/// list of newline-terminated fragments.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Joined(String),
    Fragments(Vec<String>),
}

impl RawSource {
    fn into_lines(self) -> Vec<String> {
        let joined = match self {
            RawSource::Joined(s) => s,
            RawSource::Fragments(fragments) => fragments.concat(),
        };
        joined.split('\n').map(String::from).collect()
    }
}

/// Parse notebook JSON into cell batches. Cells that are neither code nor
/// markdown (raw cells, outputs of unknown kinds) are skipped.
pub fn parse_notebook(text: &str) -> Result<Vec<Cell>, NotebookError> {
    let raw: RawNotebook = serde_json::from_str(text)?;
    if let Some(version) = raw.nbformat {
        if version != 4 {
            return Err(NotebookError::UnsupportedVersion { found: version });
        }
    }
    Ok(raw
        .cells
        .into_iter()
        .filter_map(|cell| {
            let kind = match cell.cell_type.as_str() {
                "code" => CellKind::Code,
                "markdown" => CellKind::Text,
                _ => return None,
            };
            Some(Cell {
                kind,
                lines: cell.source.into_lines(),
            })
        })
        .collect())
}

/// Read and parse a notebook file.
pub fn read_notebook(path: &Path) -> Result<Vec<Cell>, NotebookError> {
    let text = fs::read_to_string(path)?;
    parse_notebook(&text)
}

/// Pass cell batches through the tangle pipeline and materialize the final
/// module text. Code cells are transformed line by line; text cells become
/// `# ` comment lines verbatim. End-of-stream issues are logged.
pub fn tangle_cells(cells: &[Cell], mode: Mode) -> String {
    let mut pipeline = Pipeline::new(mode);
    let mut lines_out: Vec<String> = Vec::new();
    for cell in cells {
        match cell.kind {
            CellKind::Code => {
                let mut cell_lines: Vec<String> = cell
                    .lines
                    .iter()
                    .filter_map(|line| pipeline.process_line(Some(line)).map(|e| e.text))
                    .collect();
                if !cell_lines.is_empty() {
                    lines_out.append(&mut cell_lines);
                    lines_out.push(String::new());
                }
            }
            CellKind::Text => {
                for line in &cell.lines {
                    lines_out.push(format!("# {line}"));
                }
            }
        }
    }
    for issue in pipeline.finish() {
        log::warn!("{issue}");
    }
    collapse_blank_lines(&lines_out.join("\n"))
}

/// Transform a plain annotated source text (one implicit code cell).
pub fn tangle_source(source: &str, mode: Mode) -> String {
    let mut pipeline = Pipeline::new(mode);
    let text = pipeline.transform(source);
    for issue in pipeline.finish() {
        log::warn!("{issue}");
    }
    collapse_blank_lines(&text)
}

/// Locate the notebook file for a module-style name, probing the plain
/// filename and then the hyphen and space variants of its underscores.
pub fn find_notebook(fullname: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let name = fullname.rsplit('.').next().unwrap_or(fullname);
    let default_paths = [PathBuf::from("")];
    let paths: &[PathBuf] = if search_paths.is_empty() {
        &default_paths
    } else {
        search_paths
    };
    for dir in paths {
        let candidates = [
            format!("{name}.ipynb"),
            format!("{}.ipynb", name.replace('_', "-")),
            format!("{}.ipynb", name.replace('_', " ")),
        ];
        for candidate in candidates {
            let path = dir.join(candidate);
            if path.is_file() {
                return Some(path);
            }
        }
    }
    None
}
