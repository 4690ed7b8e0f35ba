//! Composed tangle pipeline
//!
//! Drives the three stages in order for each input line: the tag recognizer,
//! the procedure collector, and the output filter. Each stage consumes one
//! item and produces at most one item; nothing is buffered beyond the
//! current line and the collector's nesting stack.

use crate::tangle::collector::{Collector, Emitted, OutTag};
use crate::tangle::error::TangleError;
use crate::tangle::filter::{passes, Mode};
use crate::tangle::tags::{Recognition, Recognizer};

/// The full recognizer -> collector -> filter chain for one line stream.
///
/// Two pipelines never share state; feeding lines from different documents
/// into one pipeline interleaves their procedure stacks.
#[derive(Debug)]
pub struct Pipeline {
    recognizer: Recognizer,
    collector: Collector,
    mode: Mode,
}

impl Pipeline {
    pub fn new(mode: Mode) -> Self {
        Pipeline {
            recognizer: Recognizer::new(),
            collector: Collector::new(),
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Toggle tag recognition for subsequent lines (see
    /// [`Recognizer::set_enabled`]).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.recognizer.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.recognizer.is_enabled()
    }

    /// Feed one line. `None` means "re-poll without producing new output"
    /// and leaves all state untouched.
    ///
    /// Returns at most one output item; its text may be multi-line generated
    /// text (a full definition) joined by internal newlines.
    pub fn process_line(&mut self, line: Option<&str>) -> Option<Emitted> {
        let line = line?;
        match self.recognizer.recognize(line) {
            Recognition::Dropped => None,
            Recognition::Raw(text) => Some(Emitted {
                tag: OutTag::Code,
                text,
            }),
            Recognition::Line(tagged) => {
                let meta = self.recognizer.meta().clone();
                let emitted = self.collector.process(tagged, &meta)?;
                passes(self.mode, emitted.tag).then_some(emitted)
            }
        }
    }

    /// Feed a whole source text and join the surviving lines.
    pub fn transform(&mut self, source: &str) -> String {
        let lines: Vec<String> = source
            .split('\n')
            .filter_map(|line| self.process_line(Some(line)).map(|e| e.text))
            .collect();
        lines.join("\n")
    }

    /// Report end-of-stream diagnostics (unterminated skip regions, entities
    /// still open) and reset the collector.
    pub fn finish(&mut self) -> Vec<TangleError> {
        self.collector.finish()
    }

    /// True when the collector holds no partial state.
    pub fn is_idle(&self) -> bool {
        self.collector.is_idle()
    }
}

/// Module-materializer normalization: collapse runs of three or more
/// consecutive blank lines to exactly two. Idempotent, safe to apply
/// repeatedly.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut blanks = 0usize;
    for line in text.split('\n') {
        if line.trim().is_empty() {
            blanks += 1;
            if blanks > 2 {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push(line);
    }
    out.join("\n")
}
