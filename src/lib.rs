/*!
A regex acceleration kernel.

This crate provides two cooperating fast paths meant to sit underneath a
full regex engine rather than replace one:

- [`onepass`]: a DFA builder and matcher for the subset of patterns that
  are *one-pass* — unambiguous enough that a single linear scan resolves
  both the match and every capture group endpoint, with no backtracking
  or NFA simulation.
- [`teddy`]: a SIMD-accelerated multi-literal prefilter ("Teddy") that
  locates candidate match positions for 2 to 64 literal strings using
  vectorized nibble-table lookups, verifying candidates by direct byte
  comparison.

Both consume collaborators this crate does not build: an NFA (see
[`nfa::Nfa`]) and, for Teddy, a plain slice of literal byte strings. The
regex parser, its NFA compiler, literal extraction, and general-purpose
NFA simulation engines (a Pike VM, a lazy DFA, a bounded backtracker) all
live outside this crate; when a pattern isn't one-pass, or a literal set
isn't complete, the caller is expected to fall back to one of those.

# Features

- `std` (default): enables `std::error::Error` impls and is required by
  `logging`.
- `alloc` (default): enables the allocating pieces of the crate (the
  one-pass builder, Teddy, the sparse set). Without it, only the packed
  [`transition::Transition`] encoding and [`util::alphabet::ByteClasses`]
  are available.
- `perf-literal-substring` (default): pulls in `memchr` for cheap
  single/dual-byte scans used ahead of constructing a full Teddy
  instance.
- `unicode` (default): reserved for parity with callers that gate on it
  when deciding whether to hand this crate a case-folded NFA; this crate
  never interprets Unicode semantics itself.
- `logging`: routes internal `trace!`/`debug!` calls through the `log`
  crate. Off by default, and never used in a per-byte search loop.
- `testutil`: exposes [`nfa::Builder`], the hand-assembly fragment
  builder used to construct test NFAs without a parser.
*/

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod error;
#[cfg(feature = "alloc")]
pub mod nfa;
#[cfg(feature = "alloc")]
pub mod onepass;
#[cfg(feature = "alloc")]
pub mod teddy;
pub mod transition;
pub mod util;

/// A `trace!`-shaped macro that compiles to nothing unless the `logging`
/// feature is enabled, in which case it forwards to `log::trace!`.
///
/// Used only at build time and on terminal search outcomes, never in
/// the per-byte matching loop: even a disabled `log` call can perturb
/// codegen in a hot loop, so call sites are restricted to
/// construction-time and one-shot decisions.
#[cfg(feature = "logging")]
macro_rules! trace {
    ($($tt:tt)*) => { log::trace!($($tt)*) };
}
#[cfg(not(feature = "logging"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

/// See [`trace!`]; logs at debug level when `logging` is enabled.
#[cfg(feature = "logging")]
macro_rules! debug {
    ($($tt:tt)*) => { log::debug!($($tt)*) };
}
#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

pub(crate) use debug;
pub(crate) use trace;
