//! Output Filter
//!
//! Stage three of the tangle pipeline: decides which collector emissions
//! reach the final text, depending on the target mode.
//!
//! Interactive mode passes every line so side effects execute live. Module
//! mode keeps only top-level code and generated definitions, so procedure
//! and example bodies never execute at import time.

use crate::tangle::collector::OutTag;

/// Target mode for the transformed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Treat input as an interactive session: execute all lines, declare all
    /// procedures.
    Interactive,
    /// Treat input as a module: execute only lines outside procedures and
    /// not explicitly skipped, declare all procedures.
    Module,
}

/// Whether an emission with this tag passes through in the given mode.
pub fn passes(mode: Mode, tag: OutTag) -> bool {
    match mode {
        Mode::Interactive => true,
        Mode::Module => matches!(tag, OutTag::Code | OutTag::EndProc | OutTag::EndExample),
    }
}
