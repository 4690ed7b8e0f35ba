//! Property-based tests for the tangle pipeline
//!
//! These ensure that untagged input survives the pipeline unchanged and
//! that arbitrary marker soup can never wedge or panic the state machine.

use proptest::prelude::*;
use tangle::tangle::filter::Mode;
use tangle::tangle::pipeline::{collapse_blank_lines, Pipeline};

/// Lines that can never start with a `%` marker.
fn code_line() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _=+()#.:]{0,30}"
}

/// A mix of well-known markers and arbitrary printable text.
fn any_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("%def f(a=1):".to_string()),
        Just("%def g():".to_string()),
        Just("%return a".to_string()),
        Just("%return".to_string()),
        Just("%example".to_string()),
        Just("%example demo".to_string()),
        Just("%end_example".to_string()),
        Just("%/*".to_string()),
        Just("%*/".to_string()),
        Just("%- x".to_string()),
        Just("%--".to_string()),
        Just("%+ x".to_string()),
        Just("%@ cached".to_string()),
        "[ -~]{0,30}",
    ]
}

proptest! {
    /// Feeding a stream with no tag markers through the pipeline in module
    /// mode yields the input unchanged, modulo blank-line collapsing.
    #[test]
    fn code_only_input_round_trips(lines in proptest::collection::vec(code_line(), 0..40)) {
        let source = lines.join("\n");
        let mut pipeline = Pipeline::new(Mode::Module);
        let out = pipeline.transform(&source);
        prop_assert!(pipeline.finish().is_empty());
        prop_assert_eq!(&out, &source);
        prop_assert_eq!(
            collapse_blank_lines(&out),
            collapse_blank_lines(&source)
        );
    }

    /// No input sequence may panic the pipeline, and after finish() the
    /// collector always returns to the idle state.
    #[test]
    fn arbitrary_input_never_wedges_the_machine(
        lines in proptest::collection::vec(any_line(), 0..60)
    ) {
        let mut pipeline = Pipeline::new(Mode::Module);
        for line in &lines {
            pipeline.process_line(Some(line));
            pipeline.process_line(None);
        }
        pipeline.finish();
        prop_assert!(pipeline.is_idle());
    }

    /// Collapsing blank lines is idempotent and never leaves a run of more
    /// than two blank lines.
    #[test]
    fn blank_line_collapsing_is_idempotent(lines in proptest::collection::vec("[ax]{0,2}", 0..50)) {
        let text = lines.join("\n");
        let once = collapse_blank_lines(&text);
        prop_assert_eq!(collapse_blank_lines(&once), once.clone());
        let mut blanks = 0usize;
        for line in once.split('\n') {
            if line.trim().is_empty() { blanks += 1; } else { blanks = 0; }
            prop_assert!(blanks <= 2);
        }
    }
}
