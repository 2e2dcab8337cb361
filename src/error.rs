/*!
The error type returned by the one-pass DFA builder.

Nothing else in this crate's public surface fails with an error value: a
search that finds nothing returns `None`/`-1` as appropriate, and a Teddy
prefilter that can't be built for the given patterns returns `None`. Only
construction of a one-pass DFA can fail outright, and when it does, no
partial DFA is produced — the caller is expected to fall back to a
different execution strategy (a lazy DFA, a backtracker, a Pike VM; all
out of scope for this crate).
*/

use core::fmt;

/// An error that occurs when building a [`OnePass`](crate::onepass::OnePass)
/// DFA fails.
///
/// This type intentionally exposes no public constructors: every value is
/// built internally by the builder, which guarantees that the named limit
/// actually reflects the violation reported.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildError {
    kind: ErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ErrorKind {
    NotOnePass,
    TooManyCaptures { limit: usize, given: usize },
    TooManyStates { limit: usize },
    ExceededSizeLimit { limit: usize },
}

impl BuildError {
    pub(crate) fn not_one_pass() -> BuildError {
        BuildError { kind: ErrorKind::NotOnePass }
    }

    pub(crate) fn too_many_captures(limit: usize, given: usize) -> BuildError {
        BuildError { kind: ErrorKind::TooManyCaptures { limit, given } }
    }

    pub(crate) fn too_many_states(limit: usize) -> BuildError {
        BuildError { kind: ErrorKind::TooManyStates { limit } }
    }

    pub(crate) fn exceeded_size_limit(limit: usize) -> BuildError {
        BuildError { kind: ErrorKind::ExceededSizeLimit { limit } }
    }

    /// Returns true if and only if this error occurred because the
    /// pattern was not one-pass (ambiguity was detected during closure
    /// computation or transition emission).
    pub fn is_not_one_pass(&self) -> bool {
        matches!(self.kind, ErrorKind::NotOnePass)
    }

    /// Returns true if and only if this error occurred because the
    /// pattern's capture count exceeded the slot-mask budget (17 total
    /// groups, i.e., 16 explicit groups plus the implicit group 0).
    pub fn is_too_many_captures(&self) -> bool {
        matches!(self.kind, ErrorKind::TooManyCaptures { .. })
    }

    /// Returns true if and only if this error occurred because the
    /// number of states required to represent the pattern exceeded
    /// [`StateID::MAX`](crate::util::primitives::StateID::MAX).
    pub fn is_too_many_states(&self) -> bool {
        matches!(self.kind, ErrorKind::TooManyStates { .. })
    }

    /// Returns true if and only if this error occurred because
    /// [`Config::size_limit`](crate::onepass::Config::size_limit) was
    /// exceeded during construction.
    pub fn is_exceeded_size_limit(&self) -> bool {
        matches!(self.kind, ErrorKind::ExceededSizeLimit { .. })
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::NotOnePass => write!(
                f,
                "pattern is not one-pass: an ambiguous continuation was \
                 found while computing an epsilon closure or emitting \
                 byte-class transitions",
            ),
            ErrorKind::TooManyCaptures { limit, given } => write!(
                f,
                "pattern has {given} total capture groups, which exceeds \
                 the one-pass DFA's limit of {limit} (16 explicit groups \
                 plus the implicit group 0)",
            ),
            ErrorKind::TooManyStates { limit } => write!(
                f,
                "pattern requires more than {limit} one-pass DFA states, \
                 which exceeds the maximum representable state ID",
            ),
            ErrorKind::ExceededSizeLimit { limit } => write!(
                f,
                "one-pass DFA construction exceeded the configured size \
                 limit of {limit} bytes",
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}
