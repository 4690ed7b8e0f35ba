//! Procedure Collector
//!
//! Stage two of the tangle pipeline: a stack-based state machine that
//! interprets the tag stream, builds `Procedure`/`Example` entities from it,
//! and emits either the original code, a generated definition, or nothing.
//!
//! Nesting is supported by pushing the currently active entity whenever a new
//! begin marker arrives and popping it back when the inner entity ends; the
//! inner entity's call line is then spliced into the outer entity's body at
//! the point where the inner block appeared.
//!
//! Skip regions are fully opaque: between `BEGIN_SKIP` and `END_SKIP` no tag
//! is interpreted at all, so an unbalanced `%def` inside a skipped region can
//! never desynchronize the stack.

use crate::tangle::error::TangleError;
use crate::tangle::procedure::Entity;
use crate::tangle::tags::{LineMeta, Tag, TaggedLine};
use std::fmt;

/// The collector's output tag vocabulary, consumed by the output filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutTag {
    /// Top-level code, outside any entity.
    Code,
    /// A body line of the entity currently being collected.
    ProcCode,
    /// A line executed interactively but excluded from any body and from
    /// module output.
    SkipLine,
    /// A generated procedure definition.
    EndProc,
    /// A generated example definition (empty for anonymous examples).
    EndExample,
}

impl fmt::Display for OutTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutTag::Code => "CODE",
            OutTag::ProcCode => "PROC_CODE",
            OutTag::SkipLine => "SKIP_LINE",
            OutTag::EndProc => "END_PROC",
            OutTag::EndExample => "END_EXAMPLE",
        };
        f.write_str(name)
    }
}

/// One line of collector output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub tag: OutTag,
    /// Possibly multi-line generated text joined by internal newlines.
    pub text: String,
}

/// Stage two of the pipeline.
#[derive(Debug, Default)]
pub struct Collector {
    /// Previously active entities, outer first. `None` entries mark begin
    /// markers seen at top level, keeping push/pop balanced.
    stack: Vec<Option<Entity>>,
    active: Option<Entity>,
    /// Line number of the `BEGIN_SKIP` marker while inside a skip region.
    skip_since: Option<usize>,
}

impl Collector {
    pub fn new() -> Self {
        Collector::default()
    }

    /// True when no entity is being collected and no skip region is open.
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.stack.is_empty() && self.skip_since.is_none()
    }

    /// Number of entities currently under construction.
    pub fn depth(&self) -> usize {
        self.stack.iter().flatten().count() + usize::from(self.active.is_some())
    }

    /// Consume one tagged line, producing at most one output item.
    pub fn process(&mut self, tagged: TaggedLine, meta: &LineMeta) -> Option<Emitted> {
        if self.skip_since.is_some() {
            if tagged.tag == Tag::EndSkip {
                self.skip_since = None;
                // The end marker's remainder resumes the stream as plain code.
                return self.handle_code(tagged.text, meta);
            }
            return None;
        }

        match tagged.tag {
            Tag::BeginSkip => {
                self.skip_since = Some(meta.line_no);
                None
            }
            Tag::SkipLine => Some(Emitted {
                tag: OutTag::SkipLine,
                text: tagged.text,
            }),
            Tag::BeginProc => {
                self.begin(Entity::procedure(&tagged.text, meta));
                None
            }
            Tag::BeginExample => {
                self.begin(Entity::example(&tagged.text, meta));
                None
            }
            Tag::Code => self.handle_code(tagged.text, meta),
            Tag::EndProc => {
                if self.active.as_ref().is_some_and(|e| e.is_callable()) {
                    Some(Emitted {
                        tag: OutTag::EndProc,
                        text: self.end_active(&tagged.text, meta),
                    })
                } else {
                    self.unexpected(Tag::EndProc, &tagged.text, meta);
                    None
                }
            }
            Tag::EndExample => {
                if self.active.as_ref().is_some_and(|e| e.is_example()) {
                    Some(Emitted {
                        tag: OutTag::EndExample,
                        text: self.end_active(&tagged.text, meta),
                    })
                } else {
                    self.unexpected(Tag::EndExample, &tagged.text, meta);
                    None
                }
            }
            other => {
                // EndSkip outside a region, ToggleSkip, InsertLine,
                // ToggleInsert, Decorator: no defined transition.
                self.unexpected(other, &tagged.text, meta);
                None
            }
        }
    }

    /// Report end-of-stream diagnostics and reset the machine.
    ///
    /// An unterminated skip region is returned to the caller (everything
    /// from its start was dropped); entities still open are discarded with
    /// a warning.
    pub fn finish(&mut self) -> Vec<TangleError> {
        let mut issues = Vec::new();
        if let Some(start_line) = self.skip_since.take() {
            let issue = TangleError::UnterminatedSkipRegion { start_line };
            log::warn!("{issue}");
            issues.push(issue);
        }
        for entity in self.active.take().into_iter().chain(
            std::mem::take(&mut self.stack).into_iter().flatten(),
        ) {
            log::warn!(
                "input ended while still collecting '{}'; its definition was discarded",
                entity.name().unwrap_or("<anonymous example>")
            );
        }
        issues
    }

    fn begin(&mut self, entity: Result<Entity, TangleError>) {
        match entity {
            Ok(entity) => {
                self.stack.push(self.active.take());
                self.active = Some(entity);
            }
            Err(err) => log::error!("{err}"),
        }
    }

    /// Finalize the active entity, restore the outer one, and splice the
    /// call line into the outer body.
    fn end_active(&mut self, results_line: &str, meta: &LineMeta) -> String {
        let entity = self.active.take().expect("checked by the caller");
        let finished = entity.finish(results_line);
        self.active = self.stack.pop().flatten();
        if let Some(call) = finished.call {
            if let Some(outer) = self.active.as_mut() {
                if let Err(err) = outer.add_line(&call, meta) {
                    log::error!("inserting call into the outer procedure: {err}");
                }
            }
        }
        finished.text
    }

    fn handle_code(&mut self, text: String, meta: &LineMeta) -> Option<Emitted> {
        match self.active.as_mut() {
            Some(entity) => match entity.add_line(&text, meta) {
                Ok(()) => Some(Emitted {
                    tag: OutTag::ProcCode,
                    text,
                }),
                Err(err) => {
                    // Fail fast: silently losing indentation would corrupt
                    // the generated code, so the entity is discarded whole.
                    log::error!("{err}");
                    self.active = self.stack.pop().flatten();
                    None
                }
            },
            None => Some(Emitted {
                tag: OutTag::Code,
                text,
            }),
        }
    }

    fn unexpected(&self, tag: Tag, line: &str, meta: &LineMeta) {
        log::error!(
            "{}",
            TangleError::UnexpectedTag {
                line_no: meta.line_no,
                tag,
                line: line.to_string(),
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(indent: &str, line_no: usize) -> LineMeta {
        LineMeta {
            indent: indent.to_string(),
            line_no,
        }
    }

    fn line(tag: Tag, text: &str) -> TaggedLine {
        TaggedLine {
            tag,
            text: text.to_string(),
            options: None,
        }
    }

    /// Feed (tag, text) pairs with a default meta, collecting emissions.
    fn run(collector: &mut Collector, lines: &[(Tag, &str)]) -> Vec<Emitted> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(i, (tag, text))| {
                collector.process(line(*tag, text), &meta("", i + 1))
            })
            .collect()
    }

    #[test]
    fn test_top_level_code_passes_through() {
        let mut collector = Collector::new();
        let out = run(&mut collector, &[(Tag::Code, "x = 1")]);
        assert_eq!(out, vec![Emitted { tag: OutTag::Code, text: "x = 1".to_string() }]);
        assert!(collector.is_idle());
    }

    #[test]
    fn test_procedure_collection_emits_body_then_definition() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginProc, "foo(n=8):"),
                (Tag::Code, "res = n * 2"),
                (Tag::EndProc, "res"),
            ],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].tag, OutTag::ProcCode);
        assert_eq!(out[0].text, "res = n * 2");
        assert_eq!(out[1].tag, OutTag::EndProc);
        assert!(out[1].text.contains("def foo(n=8):"));
        assert!(collector.is_idle());
    }

    #[test]
    fn test_nested_procedure_call_is_spliced_into_outer_body() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginProc, "outer():"),
                (Tag::Code, "y = 1"),
                (Tag::BeginProc, "inner():"),
                (Tag::Code, "x = 2"),
                (Tag::EndProc, "x"),
                (Tag::Code, "z = y + x"),
                (Tag::EndProc, "y"),
            ],
        );
        let definitions: Vec<&Emitted> =
            out.iter().filter(|e| e.tag == OutTag::EndProc).collect();
        assert_eq!(definitions.len(), 2);
        assert!(definitions[0].text.contains("def inner():"));
        assert!(definitions[1].text.contains("def outer():"));
        // The call line sits between the outer body lines, at their level.
        assert!(definitions[1]
            .text
            .contains("    y = 1\n    x = inner()\n    z = y + x"));
        assert!(collector.is_idle());
    }

    #[test]
    fn test_malformed_header_leaves_state_unchanged() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginProc, "foo(:"),
                (Tag::Code, "x = 1"),
            ],
        );
        // The bad header starts nothing; the code line is top-level.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, OutTag::Code);
        assert!(collector.is_idle());
    }

    #[test]
    fn test_end_proc_without_active_procedure_is_dropped() {
        let mut collector = Collector::new();
        let out = run(&mut collector, &[(Tag::EndProc, "res"), (Tag::Code, "x = 1")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, OutTag::Code);
    }

    #[test]
    fn test_end_proc_on_example_is_unexpected() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[(Tag::BeginExample, ""), (Tag::EndProc, "res")],
        );
        assert!(out.is_empty());
        // The example is still being collected.
        assert_eq!(collector.depth(), 1);
    }

    #[test]
    fn test_skip_line_is_forwarded_but_not_collected() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginProc, "foo():"),
                (Tag::SkipLine, "df.plot()"),
                (Tag::EndProc, ""),
            ],
        );
        assert_eq!(out[0].tag, OutTag::SkipLine);
        assert!(!out[1].text.contains("df.plot()"));
    }

    #[test]
    fn test_skip_region_is_opaque_to_tags() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginSkip, ""),
                (Tag::BeginProc, "skipped_fn():"),
                (Tag::Code, "x = 1"),
                (Tag::EndProc, "x"),
                (Tag::EndSkip, ""),
                (Tag::Code, "after = 1"),
            ],
        );
        // Only the END_SKIP remainder (an empty code line) and the trailing
        // code line come out; no definition, no stack activity.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Emitted { tag: OutTag::Code, text: String::new() });
        assert_eq!(out[1].text, "after = 1");
        assert!(collector.is_idle());
    }

    #[test]
    fn test_anonymous_example_emits_empty_text_and_no_call() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginExample, ""),
                (Tag::Code, "print(1)"),
                (Tag::EndExample, ""),
            ],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], Emitted { tag: OutTag::EndExample, text: String::new() });
        assert!(collector.is_idle());
    }

    #[test]
    fn test_procedure_inside_example_is_still_exported() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::BeginExample, ""),
                (Tag::BeginProc, "fn_in_example(a=2):"),
                (Tag::Code, "b = a"),
                (Tag::EndProc, "b"),
                (Tag::EndExample, ""),
            ],
        );
        let definitions: Vec<&Emitted> =
            out.iter().filter(|e| e.tag == OutTag::EndProc).collect();
        assert_eq!(definitions.len(), 1);
        assert!(definitions[0].text.contains("def fn_in_example(a=2):"));
    }

    #[test]
    fn test_undefined_tags_are_dropped_with_state_unchanged() {
        let mut collector = Collector::new();
        let out = run(
            &mut collector,
            &[
                (Tag::ToggleSkip, ""),
                (Tag::InsertLine, "x = 1"),
                (Tag::ToggleInsert, ""),
                (Tag::Decorator, "cached"),
                (Tag::EndSkip, ""),
                (Tag::Code, "y = 2"),
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "y = 2");
        assert!(collector.is_idle());
    }

    #[test]
    fn test_indentation_violation_discards_the_procedure() {
        let mut collector = Collector::new();
        let mut emissions = Vec::new();
        let lines = [
            (Tag::BeginProc, "inner():", "    "),
            (Tag::Code, "  x = 1", "    "), // does not start with the indent
            (Tag::Code, "after = 1", "    "),
        ];
        for (i, (tag, text, indent)) in lines.iter().enumerate() {
            if let Some(e) = collector.process(line(*tag, text), &meta(indent, i + 1)) {
                emissions.push(e);
            }
        }
        // The violating line is dropped, the entity is discarded, and the
        // next code line is back at top level.
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0].tag, OutTag::Code);
        assert_eq!(emissions[0].text, "after = 1");
        assert!(collector.is_idle());
    }

    #[test]
    fn test_finish_reports_unterminated_skip_region() {
        let mut collector = Collector::new();
        run(&mut collector, &[(Tag::BeginSkip, ""), (Tag::Code, "x = 1")]);
        let issues = collector.finish();
        assert_eq!(
            issues,
            vec![TangleError::UnterminatedSkipRegion { start_line: 1 }]
        );
        assert!(collector.is_idle());
    }

    #[test]
    fn test_finish_discards_unclosed_procedures() {
        let mut collector = Collector::new();
        run(
            &mut collector,
            &[(Tag::BeginProc, "foo():"), (Tag::Code, "x = 1")],
        );
        assert_eq!(collector.depth(), 1);
        let issues = collector.finish();
        assert!(issues.is_empty());
        assert!(collector.is_idle());
    }
}
