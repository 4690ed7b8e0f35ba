//! Tag Recognition
//!
//! Stage one of the tangle pipeline: classify each input line by its leading
//! marker, strip the marker, and forward the tagged remainder together with
//! positional metadata (the indentation currently in effect).
//!
//! A marker line has the shape `<indent>%[options]<code><spaces>`, e.g.
//! `%def foo(n=8):` or `    %return res`. The indentation recorded from a
//! marker line persists for all following lines until another marker
//! overrides it.

use crate::tangle::error::{IndentViolation, TangleError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Width of one indentation step, in spaces.
pub const INDENT_UNIT: usize = 4;

/// Line-prefix pattern: optional indent, `%`, optional bracketed options,
/// then the marker code, then optional trailing spaces.
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ ]*)%(?P<options>\[[^\]]*\])?(?P<code>[a-zA-Z_+\-/*@]+)[ ]*")
        .expect("tag prefix regex is valid")
});

/// Classification of one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Code,
    BeginProc,
    EndProc,
    BeginExample,
    EndExample,
    SkipLine,
    BeginSkip,
    EndSkip,
    ToggleSkip,
    InsertLine,
    ToggleInsert,
    Decorator,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Code => "CODE",
            Tag::BeginProc => "BEGIN_PROC",
            Tag::EndProc => "END_PROC",
            Tag::BeginExample => "BEGIN_EXAMPLE",
            Tag::EndExample => "END_EXAMPLE",
            Tag::SkipLine => "SKIP_LINE",
            Tag::BeginSkip => "BEGIN_SKIP",
            Tag::EndSkip => "END_SKIP",
            Tag::ToggleSkip => "TOGGLE_SKIP",
            Tag::InsertLine => "INSERT_LINE",
            Tag::ToggleInsert => "TOGGLE_INSERT",
            Tag::Decorator => "DECORATOR",
        };
        f.write_str(name)
    }
}

/// Fixed marker-to-tag table. The marker grammar is user-facing and must be
/// preserved exactly.
pub const TAG_MARKERS: &[(&str, Tag)] = &[
    ("def", Tag::BeginProc),
    ("return", Tag::EndProc),
    ("example", Tag::BeginExample),
    ("end_example", Tag::EndExample),
    ("-", Tag::SkipLine),
    ("//", Tag::SkipLine),
    ("--", Tag::ToggleSkip),
    ("/*", Tag::BeginSkip),
    ("*/", Tag::EndSkip),
    ("+", Tag::InsertLine),
    ("++", Tag::ToggleInsert),
    ("@", Tag::Decorator),
];

/// Look up the tag for a marker code, if it is one we know.
pub fn marker_tag(code: &str) -> Option<Tag> {
    TAG_MARKERS
        .iter()
        .find(|(marker, _)| *marker == code)
        .map(|(_, tag)| *tag)
}

/// Positional metadata carried alongside every tagged line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMeta {
    /// Indentation prefix currently in effect (whole indent units only).
    pub indent: String,
    /// 1-based number of the most recently fed line.
    pub line_no: usize,
}

/// One classified line: the tag, the line text with the marker stripped, and
/// the bracketed tag options if any were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub tag: Tag,
    pub text: String,
    pub options: Option<String>,
}

/// Outcome of recognizing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// A tagged line for the collector.
    Line(TaggedLine),
    /// Recognition is disabled: the line bypasses the collector entirely.
    Raw(String),
    /// The line produces no output at all.
    Dropped,
}

/// Stage one of the pipeline. Owns the persistent line metadata and the
/// enabled/disabled toggle.
#[derive(Debug)]
pub struct Recognizer {
    meta: LineMeta,
    enabled: bool,
}

impl Recognizer {
    pub fn new() -> Self {
        Recognizer {
            meta: LineMeta {
                indent: String::new(),
                line_no: 0,
            },
            enabled: true,
        }
    }

    /// Toggle tag recognition. Takes effect from the next line fed in.
    ///
    /// While disabled, `BEGIN_PROC` markers are fully suppressed and every
    /// other line passes through with its marker stripped, untagged.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Metadata as of the most recently recognized line.
    pub fn meta(&self) -> &LineMeta {
        &self.meta
    }

    /// Classify one line.
    pub fn recognize(&mut self, line: &str) -> Recognition {
        self.meta.line_no += 1;

        let caps = match TAG_REGEX.captures(line) {
            Some(caps) => caps,
            None => return self.pass_code(line),
        };
        let tag = match marker_tag(&caps["code"]) {
            Some(tag) => tag,
            None => return self.pass_code(line),
        };

        let indent = caps.name("indent").map_or("", |m| m.as_str());
        if indent.len() % INDENT_UNIT != 0 {
            // Structural corruption: skip the line, keep the last good indent.
            log::error!(
                "{}",
                TangleError::IndentationViolation {
                    line_no: self.meta.line_no,
                    line: line.to_string(),
                    reason: IndentViolation::NotUnitMultiple {
                        width: indent.len()
                    },
                }
            );
            return Recognition::Dropped;
        }
        self.meta.indent = indent.to_string();

        let matched = caps.get(0).expect("whole-pattern group always present");
        let text = line[matched.end()..].to_string();
        let options = caps
            .name("options")
            .map(|m| m.as_str()[1..m.as_str().len() - 1].to_string());

        if !self.enabled {
            return if tag == Tag::BeginProc {
                Recognition::Dropped
            } else {
                Recognition::Raw(text)
            };
        }

        log::debug!("found tag {tag} on line {}", self.meta.line_no);
        Recognition::Line(TaggedLine { tag, text, options })
    }

    fn pass_code(&self, line: &str) -> Recognition {
        if self.enabled {
            Recognition::Line(TaggedLine {
                tag: Tag::Code,
                text: line.to_string(),
                options: None,
            })
        } else {
            Recognition::Raw(line.to_string())
        }
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}
