use crate::sync::RootId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors returned by text source mutations.
pub enum TextSourceError {
    #[error("invalid run range {start}..{end} (source has {count} runs)")]
    /// The run range is reversed or past the end of the run sequence.
    InvalidRunRange {
        /// First run index.
        start: usize,
        /// Limit run index.
        end: usize,
        /// Number of runs in the source.
        count: usize,
    },

    #[error("source has no mapping table; substitutions are not accepted")]
    /// A substitution was supplied to a source without the mapping capability.
    MappingNotEnabled,

    #[error("substitution offset {offset} is outside a run of length {len}")]
    /// A substitution offset does not fall inside its run.
    SubstitutionOutOfRange {
        /// Run-relative offset.
        offset: usize,
        /// Run length in characters.
        len: usize,
    },

    #[error("character at run offset {offset} is not an object replacement character")]
    /// A substitution does not replace a placeholder character.
    NotAPlaceholder {
        /// Run-relative offset.
        offset: usize,
    },

    #[error("substitution at run offset {offset} has empty text")]
    /// A substitution carries no text.
    EmptySubstitution {
        /// Run-relative offset.
        offset: usize,
    },

    #[error("duplicate substitution at run offset {offset}")]
    /// Two substitutions target the same placeholder.
    DuplicateSubstitution {
        /// Run-relative offset.
        offset: usize,
    },

    #[error("concordance target {start}..{end} is outside the source (length {len})")]
    /// The concordance target range is reversed or out of bounds.
    InvalidTarget {
        /// Target start.
        start: usize,
        /// Target end.
        end: usize,
        /// Logical length of the embedded source.
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Synchronizer contract violations.
///
/// A correct program never receives these; they report broken invariants instead of
/// corrupting the shared layout state.
pub enum SyncError {
    #[error("cannot register a root after lazy expansion has started")]
    /// `add_root` was called after the first `expand_lazy_items`.
    RegistrationFrozen,

    #[error("top-to-top synchronization requested while already synchronizing tops")]
    /// A root asked for a top sync while one was running.
    ReentrantTopSync,

    #[error("unknown root {0:?}")]
    /// The root id is not registered.
    UnknownRoot(RootId),

    #[error("synchronizer is busy ({0})")]
    /// A top-level operation was started while another one was still running.
    Busy(&'static str),
}
