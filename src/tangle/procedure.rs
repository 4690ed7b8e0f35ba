//! Procedure and Example entities
//!
//! A `Procedure` is one tagged region of the input being collected into a
//! standalone callable definition. An `Example` is the parameterless,
//! resultless variant whose own body is never invoked; it quarantines
//! demonstration code that must not run on import.
//!
//! Header grammar: `name(param[, param]*):` where each param is
//! `identifier`, `identifier=expression`, or a bare expression. A bare
//! expression is auto-named by sanitizing it into an identifier
//! (`args.path` becomes `args_path`, `args['path']` becomes `args_path`)
//! and the original expression becomes the parameter's default. All literal
//! occurrences of a default expression inside the body are rewritten back to
//! the parameter name, so the collected body stays generic.

use crate::tangle::error::{IndentViolation, TangleError};
use crate::tangle::tags::LineMeta;
use once_cell::sync::Lazy;
use regex::Regex;

/// Names of exported examples are prefixed to avoid collisions with ordinary
/// identifiers.
pub const EXAMPLE_PREFIX: &str = "_example_";

/// Procedure header: `name(params):` with an optionally empty parameter list.
static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\((?P<params>[^()]*)\)\s*:\s*$")
        .expect("procedure header regex is valid")
});

/// Example header: an optional bare identifier naming the example.
static EXAMPLE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>[A-Za-z_][A-Za-z0-9_]*)?\s*$")
        .expect("example header regex is valid")
});

/// Characters that cannot appear in an identifier; runs of them collapse to
/// one filler when auto-naming a bare expression.
static NON_IDENT_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"\[\].]+"#).expect("sanitize regex is valid"));

static TRAILING_FILLER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+$").expect("trailing filler regex is valid"));

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub default: Option<String>,
}

/// Derive an identifier from a default-expression text.
fn name_from_value(value: &str) -> String {
    let name = NON_IDENT_RUN_REGEX.replace_all(value, "_");
    TRAILING_FILLER_REGEX.replace(&name, "").into_owned()
}

/// Parse one parameter entry. Three cases:
/// 1. an identifier (a parameter with no default),
/// 2. a bare expression (auto-named, the expression is the default),
/// 3. `name=default`.
fn parse_param(text: &str) -> Result<Param, String> {
    let items: Vec<&str> = text.split('=').map(str::trim).collect();
    match items.as_slice() {
        [value] => {
            if value.is_empty() {
                return Err(format!("empty parameter entry: {text:?}"));
            }
            let name = name_from_value(value);
            if name == *value {
                Ok(Param {
                    name,
                    default: None,
                })
            } else {
                Ok(Param {
                    name,
                    default: Some((*value).to_string()),
                })
            }
        }
        [name, default] => {
            if name.is_empty() || default.is_empty() {
                return Err(format!("incomplete parameter definition: {text:?}"));
            }
            Ok(Param {
                name: (*name).to_string(),
                default: Some((*default).to_string()),
            })
        }
        _ => Err(format!("cannot parse parameter definition: {text:?}")),
    }
}

/// Parse a comma-separated parameter list. Parameter names must be distinct.
fn parse_params(params: &str) -> Result<Vec<Param>, String> {
    let trimmed = params.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in trimmed.split(',') {
        out.push(parse_param(entry)?);
    }
    for (i, param) in out.iter().enumerate() {
        if out[..i].iter().any(|p| p.name == param.name) {
            return Err(format!("duplicate parameter name: {}", param.name));
        }
    }
    Ok(out)
}

/// Distinguishes true procedures from examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Procedure,
    Example,
}

/// Result of finalizing an entity: its generated definition text and, for
/// callable entities, the call line to insert at the declaration site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub text: String,
    pub call: Option<String>,
}

/// One tagged callable region under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    kind: EntityKind,
    /// `None` only for an anonymous example.
    name: Option<String>,
    params: Vec<Param>,
    /// (default expression, parameter name) pairs, in declaration order.
    substitutions: Vec<(String, String)>,
    /// Indentation in effect at the declaration; every body line must start
    /// with exactly this prefix.
    indent: String,
    body: Vec<String>,
}

impl Entity {
    /// Construct a procedure from the text following a `%def` marker.
    pub fn procedure(header: &str, meta: &LineMeta) -> Result<Entity, TangleError> {
        let malformed = || TangleError::MalformedHeader {
            line_no: meta.line_no,
            header: header.to_string(),
        };
        let caps = HEADER_REGEX
            .captures(header.trim_end())
            .ok_or_else(|| malformed())?;
        let params = parse_params(&caps["params"]).map_err(|reason| {
            log::debug!("parameter list rejected: {reason}");
            malformed()
        })?;
        let substitutions = params
            .iter()
            .filter_map(|p| p.default.as_ref().map(|d| (d.clone(), p.name.clone())))
            .collect();
        let entity = Entity {
            kind: EntityKind::Procedure,
            name: Some(caps["name"].to_string()),
            params,
            substitutions,
            indent: meta.indent.clone(),
            body: Vec::new(),
        };
        log::debug!("collecting procedure from header: {entity:?}");
        Ok(entity)
    }

    /// Construct an example from the text following a `%example` marker.
    /// The name is optional; named examples are exported under
    /// [`EXAMPLE_PREFIX`].
    pub fn example(header: &str, meta: &LineMeta) -> Result<Entity, TangleError> {
        let caps =
            EXAMPLE_HEADER_REGEX
                .captures(header)
                .ok_or_else(|| TangleError::MalformedHeader {
                    line_no: meta.line_no,
                    header: header.to_string(),
                })?;
        let name = caps
            .name("name")
            .map(|m| format!("{EXAMPLE_PREFIX}{}", m.as_str()));
        Ok(Entity {
            kind: EntityKind::Example,
            name,
            params: Vec::new(),
            substitutions: Vec::new(),
            indent: meta.indent.clone(),
            body: Vec::new(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_example(&self) -> bool {
        self.kind == EntityKind::Example
    }

    /// Whether a call line is inserted at the declaration site when this
    /// entity ends. Examples are never invoked from the surrounding body.
    pub fn is_callable(&self) -> bool {
        self.kind == EntityKind::Procedure
    }

    /// Append one body line: check the indent invariant, strip the indent,
    /// then substitute default expressions by their parameter names.
    ///
    /// Substitution is sequential in declaration order; a later substitution
    /// sees the output of earlier ones.
    pub fn add_line(&mut self, line: &str, meta: &LineMeta) -> Result<(), TangleError> {
        let stripped = line.strip_prefix(self.indent.as_str()).ok_or_else(|| {
            TangleError::IndentationViolation {
                line_no: meta.line_no,
                line: line.to_string(),
                reason: IndentViolation::BodyMismatch {
                    expected: self.indent.clone(),
                },
            }
        })?;
        let mut text = stripped.to_string();
        for (default, name) in &self.substitutions {
            text = text.replace(default.as_str(), name);
        }
        self.body.push(text);
        Ok(())
    }

    /// Finalize the entity. `results_line` is the text following the end
    /// marker: a comma-separated list of result expressions.
    ///
    /// Produces the full definition text and, for callable entities, the
    /// call line to splice into the outer body. Each call argument is the
    /// parameter's default expression when one exists, else the parameter
    /// name, reconstituting the caller's intent. An anonymous example
    /// produces nothing.
    pub fn finish(mut self, results_line: &str) -> Finished {
        let name = match self.name.take() {
            Some(name) => name,
            None => {
                return Finished {
                    text: String::new(),
                    call: None,
                }
            }
        };

        let results: Vec<&str> = results_line
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let joined_results = results.join(", ");

        if results.is_empty() {
            self.body.push("return".to_string());
        } else {
            self.body.push(format!("return {joined_results}"));
        }

        let mut lines = vec![r#"""""#.to_string()];
        for param in &self.params {
            lines.push(match &param.default {
                Some(default) => format!(":param {}={}", param.name, default),
                None => format!(":param {}", param.name),
            });
        }
        if results.is_empty() {
            lines.push("Returns:".to_string());
        } else {
            lines.push(format!("Returns: {joined_results}"));
        }
        lines.push(r#"""""#.to_string());
        lines.append(&mut self.body);

        let signature = self
            .params
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!("{}={}", p.name, default),
                None => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = format!("\ndef {name}({signature}):\n");
        text.push_str(
            &lines
                .iter()
                .map(|l| format!("    {l}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        log::debug!("defining a function:{text}");

        let call = if self.is_callable() {
            let args = self
                .params
                .iter()
                .map(|p| p.default.clone().unwrap_or_else(|| p.name.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            let assignment = if results.is_empty() {
                String::new()
            } else {
                format!("{joined_results} = ")
            };
            Some(format!("{}{assignment}{name}({args})", self.indent))
        } else {
            None
        };

        Finished { text, call }
    }
}
