//! Main module for the tangle preprocessor core

pub mod collector;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod procedure;
pub mod tags;

pub use collector::{Collector, Emitted, OutTag};
pub use error::TangleError;
pub use filter::Mode;
pub use pipeline::{collapse_blank_lines, Pipeline};
pub use procedure::{Entity, EXAMPLE_PREFIX};
pub use tags::{Recognizer, Tag, INDENT_UNIT};
