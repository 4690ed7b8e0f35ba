//! # tangle
//!
//! A line-oriented macro/tag preprocessor that turns annotated source text
//! (originating from notebook cells) into plain, linearly executable module
//! text, extracting tagged regions into named, independently callable
//! procedures along the way.
//!
//! The core is a three-stage pipeline: a tag recognizer, a stack-based
//! procedure collector, and an output filter choosing between interactive
//! and module output. See the [`tangle`] module for the stages and the
//! [`notebook`] module for `.ipynb` reading and materialization.

pub mod notebook;
pub mod tangle;
