/*!
The one-pass DFA builder and matcher.

A pattern is *one-pass* when every anchored position in its NFA has at
most one byte-class-consistent continuation (see the one-pass property
in the crate's design notes). For such patterns, [`Builder::build`]
materializes a dense transition table that a linear scan can drive
directly, recording both the overall match and every capture group's
endpoints without any backtracking or NFA simulation.

Most patterns are not one-pass (anything with unbounded unanchored
repetition ambiguity, like `a*a`, or genuinely ambiguous alternation).
[`is_one_pass`] offers a cheap prerejection before attempting the full,
more expensive [`Builder::build`].
*/

use alloc::vec;
use alloc::vec::Vec;

use crate::error::BuildError;
use crate::nfa::{Nfa, State};
use crate::transition::{apply_match_slots, Transition};
use crate::util::alphabet::ByteClasses;
use crate::util::primitives::StateID;
use crate::util::sparse_set::SparseSet;
use crate::{debug, trace};

/// The maximum number of capture groups a one-pass DFA can track,
/// including the implicit group 0. Fixed by the 32-bit width of the
/// slot mask packed into a [`Transition`]: 17 groups means 34 slots, of
/// which only the first 32 are addressable.
pub const MAX_CAPTURE_GROUPS: usize = 17;

/// Configuration for [`Builder`].
///
/// Every option defaults to the behavior a normal caller wants; the
/// non-default settings exist for debugging and for bounding memory use
/// on adversarial or accidentally-enormous patterns.
#[derive(Clone, Debug, Default)]
pub struct Config {
    byte_classes: Option<bool>,
    size_limit: Option<Option<usize>>,
}

impl Config {
    /// Create a default configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// When `false`, the builder uses [`ByteClasses::singletons`]
    /// instead of the NFA's real equivalence classes, so every
    /// transition is keyed by its literal byte. This makes a dumped
    /// transition table readable by eye at the cost of a much wider
    /// table; it has no effect on search correctness.
    pub fn byte_classes(mut self, yes: bool) -> Config {
        self.byte_classes = Some(yes);
        self
    }

    /// Abort construction with [`BuildError::is_exceeded_size_limit`]
    /// once the DFA's heap usage would exceed `limit` bytes. `None`
    /// (the default) means no limit.
    pub fn size_limit(mut self, limit: Option<usize>) -> Config {
        self.size_limit = Some(limit);
        self
    }

    /// Returns the configured `byte_classes` setting, or its default
    /// (`true`) if unset.
    pub fn get_byte_classes(&self) -> bool {
        self.byte_classes.unwrap_or(true)
    }

    /// Returns the configured `size_limit`, or its default (`None`) if
    /// unset.
    pub fn get_size_limit(&self) -> Option<usize> {
        self.size_limit.unwrap_or(None)
    }
}

/// Builds a [`OnePass`] DFA from an [`Nfa`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a builder with a default configuration.
    pub fn new() -> Builder {
        Builder { config: Config::default() }
    }

    /// Apply a non-default configuration.
    pub fn configure(mut self, config: Config) -> Builder {
        self.config = config;
        self
    }

    /// Attempt to build a one-pass DFA for `nfa`.
    ///
    /// Fails with [`BuildError`] if `nfa` is not always anchored, has
    /// more than [`MAX_CAPTURE_GROUPS`] capture groups, is not one-pass
    /// (some reachable closure has a byte-class conflict, a revisited
    /// state, or more than one match state), would require more states
    /// than `StateID` can address, or exceeds a configured size limit.
    pub fn build(&self, nfa: &impl Nfa) -> Result<OnePass, BuildError> {
        trace!("building one-pass DFA, {} NFA states", nfa.states());
        if nfa.capture_count() > MAX_CAPTURE_GROUPS {
            debug!(
                "one-pass build failed: {} capture groups exceeds limit of {}",
                nfa.capture_count(),
                MAX_CAPTURE_GROUPS
            );
            return Err(BuildError::too_many_captures(
                MAX_CAPTURE_GROUPS,
                nfa.capture_count(),
            ));
        }
        if !nfa.is_always_anchored() {
            debug!("one-pass build failed: NFA is not always anchored");
            return Err(BuildError::not_one_pass());
        }
        let dfa = InternalBuilder::new(self.config.clone(), nfa).build()?;
        debug!(
            "one-pass build succeeded: {} states, {} bytes",
            dfa.state_count(),
            dfa.memory_usage()
        );
        Ok(dfa)
    }
}

/// A cheap prerejection for [`Builder::build`].
///
/// Returns `false` if `nfa` is definitely not buildable as a one-pass
/// DFA (not always anchored, or too many capture groups); otherwise
/// `true`. This is intentionally permissive: it accepts some patterns
/// the builder will go on to reject as ambiguous, because detecting
/// ambiguity requires walking the NFA's closures, which is exactly what
/// the builder already does. An implementation may tighten this
/// heuristic, but must never reject a pattern the builder would accept.
pub fn is_one_pass(nfa: &impl Nfa) -> bool {
    nfa.is_always_anchored() && nfa.capture_count() <= MAX_CAPTURE_GROUPS
}

/// The result of closing over the epsilon fragment of the NFA reachable
/// from one DFA state's seed.
struct Closure {
    /// Leaf states (`ByteRange`/`Sparse`) reached, paired with the slot
    /// mask accumulated along the epsilon path that reached them.
    leaves: Vec<(StateID, u32)>,
    /// The slot mask accumulated up to the first (and only permitted)
    /// `Match` state in this closure, if any.
    match_mask: Option<u32>,
    /// True if this closure's match, when present, was reached with
    /// strictly higher DFS priority than every byte-continuation leaf —
    /// i.e., this DFA state should terminate a search immediately on
    /// entry rather than preferring to consume more input. Derived from
    /// visitation order the same way the source NFA's split ordering
    /// encodes greedy-vs-lazy preference.
    match_wins: bool,
}

struct InternalBuilder<'a, N: ?Sized> {
    config: Config,
    nfa: &'a N,
    dfa: OnePass,
    classes: ByteClasses,
    nfa_to_dfa: Vec<StateID>,
    seen: SparseSet,
    stack: Vec<(StateID, u32)>,
    work: Vec<Option<(StateID, u32)>>,
    uncompiled: Vec<(StateID, Vec<(StateID, u32)>)>,
}

impl<'a, N: Nfa + ?Sized> InternalBuilder<'a, N> {
    fn new(config: Config, nfa: &'a N) -> InternalBuilder<'a, N> {
        let classes = if config.get_byte_classes() {
            nfa.byte_classes().clone()
        } else {
            ByteClasses::singletons()
        };
        let stride = classes.stride();
        let dfa = OnePass {
            table: Vec::new(),
            is_match: Vec::new(),
            match_slots: Vec::new(),
            match_wins: Vec::new(),
            classes: classes.clone(),
            stride2: classes.stride2(),
            start: StateID::DEAD,
            capture_count: nfa.capture_count(),
        };
        InternalBuilder {
            config,
            nfa,
            dfa,
            classes,
            nfa_to_dfa: vec![StateID::DEAD; nfa.states().max(1)],
            seen: SparseSet::new(nfa.states().max(1)),
            stack: Vec::new(),
            work: vec![None; stride],
            uncompiled: Vec::new(),
        }
    }

    fn build(mut self) -> Result<OnePass, BuildError> {
        let dead_id = self.add_empty_row()?;
        debug_assert_eq!(dead_id, StateID::DEAD);
        self.push_match_info(false, 0, false);

        let start = self.dfa_id_for(self.nfa.start_anchored())?;
        self.dfa.start = start;

        while let Some((dfa_id, leaves)) = self.uncompiled.pop() {
            for slot in self.work.iter_mut() {
                *slot = None;
            }
            for &(leaf_id, src_mask) in &leaves {
                match self.nfa.state(leaf_id) {
                    State::ByteRange { lo, hi, next } => {
                        self.emit_range(*lo, *hi, *next, src_mask)?;
                    }
                    State::Sparse { ranges } => {
                        for &(lo, hi, next) in ranges {
                            self.emit_range(lo, hi, next, src_mask)?;
                        }
                    }
                    _ => unreachable!("closure leaves are always byte-consuming states"),
                }
            }
            for class in 0..self.work.len() {
                let Some((target_nfa, mask)) = self.work[class] else { continue };
                let target_dfa = self.dfa_id_for(target_nfa)?;
                let match_wins = self.dfa.is_match[target_dfa.as_usize()]
                    && self.dfa.match_wins[target_dfa.as_usize()];
                let t = Transition::new(target_dfa, match_wins, 0, mask);
                self.dfa.set_transition(dfa_id, class as u8, t);
            }
        }
        Ok(self.dfa)
    }

    fn push_match_info(&mut self, is_match: bool, match_mask: u32, match_wins: bool) {
        self.dfa.is_match.push(is_match);
        self.dfa.match_slots.push(match_mask);
        self.dfa.match_wins.push(match_wins);
    }

    fn dfa_id_for(&mut self, nfa_id: StateID) -> Result<StateID, BuildError> {
        let existing = self.nfa_to_dfa[nfa_id.as_usize()];
        if !existing.is_dead() {
            return Ok(existing);
        }
        let closure = self.compute_closure(nfa_id)?;
        let dfa_id = self.add_empty_row()?;
        self.nfa_to_dfa[nfa_id.as_usize()] = dfa_id;
        self.push_match_info(
            closure.match_mask.is_some(),
            closure.match_mask.unwrap_or(0),
            closure.match_wins,
        );
        self.uncompiled.push((dfa_id, closure.leaves));
        Ok(dfa_id)
    }

    /// Computes the epsilon closure from `root`, per the one-pass
    /// property: a revisited state, a second `Match` state, or a
    /// byte-class conflict during emission are all one-pass failures.
    fn compute_closure(&mut self, root: StateID) -> Result<Closure, BuildError> {
        self.seen.clear();
        self.stack.clear();
        let mut leaves = Vec::new();
        let mut match_mask = None;
        let mut match_order = None;
        let mut leaf_min_order = None;
        let mut order = 0usize;

        if !self.seen.insert(root) {
            return Err(BuildError::not_one_pass());
        }
        self.stack.push((root, 0));
        while let Some((id, mask)) = self.stack.pop() {
            order += 1;
            match self.nfa.state(id) {
                State::Epsilon { next } => {
                    if !self.seen.insert(*next) {
                        return Err(BuildError::not_one_pass());
                    }
                    self.stack.push((*next, mask));
                }
                State::Split { left, right } => {
                    if !self.seen.insert(*right) {
                        return Err(BuildError::not_one_pass());
                    }
                    if !self.seen.insert(*left) {
                        return Err(BuildError::not_one_pass());
                    }
                    // Push right first so left — the higher-priority
                    // branch — is popped and visited first.
                    self.stack.push((*right, mask));
                    self.stack.push((*left, mask));
                }
                State::Capture { group_index, is_start, next } => {
                    let bit = 2 * *group_index + u32::from(!*is_start);
                    let new_mask =
                        if bit < 32 { mask | (1 << bit) } else { mask };
                    if !self.seen.insert(*next) {
                        return Err(BuildError::not_one_pass());
                    }
                    self.stack.push((*next, new_mask));
                }
                State::Match => {
                    if match_mask.is_some() {
                        return Err(BuildError::not_one_pass());
                    }
                    match_mask = Some(mask);
                    match_order = Some(order);
                }
                State::ByteRange { .. } | State::Sparse { .. } => {
                    leaves.push((id, mask));
                    leaf_min_order =
                        Some(leaf_min_order.map_or(order, |m: usize| m.min(order)));
                }
            }
        }
        let match_wins = match (match_order, leaf_min_order) {
            (Some(mo), Some(lo)) => mo < lo,
            (Some(_), None) => true,
            (None, _) => false,
        };
        Ok(Closure { leaves, match_mask, match_wins })
    }

    /// Folds every equivalence class touched by `lo..=hi` into the work
    /// map, declaring a one-pass failure if two distinct targets
    /// collide on the same class, and OR-ing source slot masks together
    /// when two paths agree on the same target and class.
    fn emit_range(
        &mut self,
        lo: u8,
        hi: u8,
        next: StateID,
        src_mask: u32,
    ) -> Result<(), BuildError> {
        for b in self.classes.representatives(lo..=hi) {
            let class = self.classes.get(b) as usize;
            match self.work[class] {
                None => self.work[class] = Some((next, src_mask)),
                Some((existing_next, existing_mask)) => {
                    if existing_next != next {
                        return Err(BuildError::not_one_pass());
                    }
                    self.work[class] = Some((existing_next, existing_mask | src_mask));
                }
            }
        }
        Ok(())
    }

    fn add_empty_row(&mut self) -> Result<StateID, BuildError> {
        let stride = self.classes.stride();
        let next = self.dfa.table.len() / stride;
        let id = StateID::new(next).map_err(|_| BuildError::too_many_states(StateID::LIMIT))?;
        self.dfa.table.extend(core::iter::repeat(Transition::DEAD).take(stride));
        if let Some(limit) = self.config.get_size_limit() {
            if self.dfa.memory_usage() > limit {
                return Err(BuildError::exceeded_size_limit(limit));
            }
        }
        Ok(id)
    }
}

/// A mutable per-search scratch buffer.
///
/// Owned by the caller, reset at the start of every search, and freely
/// reusable across searches against the same [`OnePass`] (or a
/// different one with an equal or smaller capture count — a cache sized
/// too small will panic on out-of-bounds indexing rather than silently
/// truncate results).
#[derive(Clone, Debug)]
pub struct Cache {
    slots: Vec<i64>,
}

impl Cache {
    /// Create a cache sized for `capture_count` capture groups
    /// (including group 0).
    pub fn new(capture_count: usize) -> Cache {
        Cache { slots: vec![-1; 2 * capture_count] }
    }

    /// Reset every slot to -1.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = -1);
    }

    /// The capture slots from the most recent search: `slots[2k]` is
    /// group `k`'s start, `slots[2k + 1]` its end, both -1 if that
    /// group did not participate in the match.
    pub fn slots(&self) -> &[i64] {
        &self.slots
    }
}

/// An immutable, compiled one-pass DFA.
#[derive(Clone, Debug)]
pub struct OnePass {
    table: Vec<Transition>,
    is_match: Vec<bool>,
    match_slots: Vec<u32>,
    match_wins: Vec<bool>,
    classes: ByteClasses,
    stride2: usize,
    start: StateID,
    capture_count: usize,
}

impl OnePass {
    #[inline]
    fn stride(&self) -> usize {
        1 << self.stride2
    }

    #[inline]
    fn transition(&self, id: StateID, class: u8) -> Transition {
        self.table[id.as_usize() * self.stride() + class as usize]
    }

    fn set_transition(&mut self, id: StateID, class: u8, t: Transition) {
        self.table[id.as_usize() * self.stride() + class as usize] = t;
    }

    #[inline]
    fn is_match_state(&self, id: StateID) -> bool {
        self.is_match[id.as_usize()]
    }

    /// The total number of capture groups, including group 0.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// The number of DFA states in this table.
    pub fn state_count(&self) -> usize {
        self.is_match.len()
    }

    /// Allocate a cache sized for this DFA's capture count.
    pub fn create_cache(&self) -> Cache {
        Cache::new(self.capture_count)
    }

    /// Approximate owned heap memory, in bytes. Exposed for the same
    /// budgeting use Teddy's `heap_bytes` serves.
    pub fn memory_usage(&self) -> usize {
        self.table.len() * core::mem::size_of::<Transition>()
            + self.is_match.len() * core::mem::size_of::<bool>()
            + self.match_slots.len() * core::mem::size_of::<u32>()
            + self.match_wins.len() * core::mem::size_of::<bool>()
    }

    /// Returns true if and only if `input` is matched by an anchored
    /// search starting at position 0. Skips slot bookkeeping entirely.
    pub fn try_is_match(&self, input: &[u8]) -> bool {
        self.try_is_match_at(input, 0)
    }

    /// Like [`OnePass::try_is_match`], but starting the search at
    /// `start`. Returns `false` (not a panic) if `start > input.len()`.
    pub fn try_is_match_at(&self, input: &[u8], start: usize) -> bool {
        if start > input.len() {
            return false;
        }
        let hay = &input[start..];
        let mut state = self.start;
        if self.is_match_state(state) {
            return true;
        }
        let mut pos = 0;
        while pos < hay.len() {
            let class = self.classes.get(hay[pos]);
            let t = self.transition(state, class);
            if t.is_dead() {
                return false;
            }
            pos += 1;
            state = t.next_state();
            if self.is_match_state(state) {
                return true;
            }
        }
        false
    }

    /// Runs an anchored search over `input` starting at position 0,
    /// filling `cache` with capture slots on success.
    pub fn try_search(&self, input: &[u8], cache: &mut Cache) -> bool {
        self.try_search_at(input, 0, cache)
    }

    /// Like [`OnePass::try_search`], but starting the search at
    /// `start`: every recorded slot position is relative to `input`
    /// (i.e., shifted by `start`), not to the sliced haystack. Returns
    /// `false` without touching `cache` if `start > input.len()`.
    pub fn try_search_at(&self, input: &[u8], start: usize, cache: &mut Cache) -> bool {
        if start > input.len() {
            return false;
        }
        cache.reset();
        let hay = &input[start..];
        cache.slots[0] = 0;
        let mut state = self.start;
        let mut pos = 0usize;
        while pos < hay.len() {
            let class = self.classes.get(hay[pos]);
            let t = self.transition(state, class);
            if t.is_dead() {
                return false;
            }
            t.update_slots(&mut cache.slots, pos);
            pos += 1;
            state = t.next_state();
            if t.is_match_wins() && self.is_match_state(state) {
                apply_match_slots(
                    self.match_slots[state.as_usize()],
                    &mut cache.slots,
                    pos,
                );
                cache.slots[1] = pos as i64;
                self.shift_slots(cache, start);
                return true;
            }
        }
        if self.is_match_state(state) {
            apply_match_slots(self.match_slots[state.as_usize()], &mut cache.slots, pos);
            cache.slots[1] = pos as i64;
            self.shift_slots(cache, start);
            return true;
        }
        false
    }

    fn shift_slots(&self, cache: &mut Cache, start: usize) {
        if start == 0 {
            return;
        }
        for slot in cache.slots.iter_mut() {
            if *slot >= 0 {
                *slot += start as i64;
            }
        }
    }

    /// A human-readable `state x byte-class` transition grid, used in
    /// tests to produce readable failure diagnostics. Not exposed
    /// outside of test builds: the real table is an implementation
    /// detail.
    #[cfg(test)]
    pub(crate) fn debug_table(&self) -> alloc::string::String {
        use core::fmt::Write as _;
        let mut out = alloc::string::String::new();
        let stride = self.stride();
        for id in 0..self.state_count() {
            let _ = write!(out, "state {id}{}: ", if self.is_match[id] { " (match)" } else { "" });
            for class in 0..stride {
                let t = self.table[id * stride + class];
                if t.is_dead() {
                    let _ = write!(out, ". ");
                } else {
                    let _ = write!(out, "{} ", t.next_state().as_usize());
                }
            }
            let _ = writeln!(out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::Builder as NfaBuilder;

    fn run(
        nfa: &impl Nfa,
        input: &[u8],
    ) -> Option<(bool, alloc::vec::Vec<i64>)> {
        let dfa = Builder::new().build(nfa).expect("build should succeed");
        let mut cache = dfa.create_cache();
        let matched = dfa.try_search(input, &mut cache);
        Some((matched, cache.slots().to_vec()))
    }

    #[test]
    fn simple_literal_matches() {
        let mut b = NfaBuilder::new();
        let frag = b.literal(b"abc");
        let nfa = b.compile(frag);
        let (matched, slots) = run(&nfa, b"abc").unwrap();
        assert!(matched);
        assert_eq!(slots, vec![0, 3]);
    }

    #[test]
    fn literal_does_not_match_prefix_only() {
        let mut b = NfaBuilder::new();
        let frag = b.literal(b"abc");
        let nfa = b.compile(frag);
        let dfa = Builder::new().build(&nfa).unwrap();
        assert!(!dfa.try_is_match(b"ab"));
    }

    #[test]
    fn alternation_inside_capture_group() {
        // a(b|c)d: matches "abd" with group 1 == "b"; does not match "aad".
        let mut b = NfaBuilder::new();
        let left = b.byte(b'b');
        let right = b.byte(b'c');
        let alt = b.alternate(left, right);
        let group = b.capture(alt);
        let a = b.byte(b'a');
        let d = b.byte(b'd');
        let ag = b.concat(a, group);
        let frag = b.concat(ag, d);
        let nfa = b.compile(frag);

        let (matched, slots) = run(&nfa, b"abd").unwrap();
        assert!(matched);
        assert_eq!(slots, vec![0, 3, 1, 2]);

        let dfa = Builder::new().build(&nfa).unwrap();
        assert!(!dfa.try_is_match(b"aad"));
    }

    #[test]
    fn too_many_captures_rejected() {
        // 16 explicit groups is fine; 17 is not (group 0 + 16 == 17 total).
        let mut b = NfaBuilder::new();
        let a0 = b.byte(b'a');
        let mut frag = b.capture(a0);
        for _ in 0..15 {
            let a = b.byte(b'a');
            let next = b.capture(a);
            frag = b.concat(frag, next);
        }
        let nfa16 = b.compile(frag);
        assert!(Builder::new().build(&nfa16).is_ok());

        let mut b = NfaBuilder::new();
        let a0 = b.byte(b'a');
        let mut frag = b.capture(a0);
        for _ in 0..16 {
            let a = b.byte(b'a');
            let next = b.capture(a);
            frag = b.concat(frag, next);
        }
        let nfa17 = b.compile(frag);
        let err = Builder::new().build(&nfa17).unwrap_err();
        assert!(err.is_too_many_captures());
    }

    #[test]
    fn ambiguous_star_then_literal_is_not_one_pass() {
        // a*a: ambiguous over how many leading 'a's the star consumes.
        let mut b = NfaBuilder::new();
        let inner = b.byte(b'a');
        let star = b.star(inner);
        let tail = b.byte(b'a');
        let frag = b.concat(star, tail);
        let nfa = b.compile(frag);
        let err = Builder::new().build(&nfa).unwrap_err();
        assert!(err.is_not_one_pass());
    }

    #[test]
    fn is_one_pass_never_rejects_what_build_accepts() {
        let mut b = NfaBuilder::new();
        let frag = b.literal(b"ok");
        let nfa = b.compile(frag);
        assert!(is_one_pass(&nfa));
        assert!(Builder::new().build(&nfa).is_ok());
    }

    #[test]
    fn search_at_shifts_slots_by_start() {
        let mut b = NfaBuilder::new();
        let frag = b.literal(b"bd");
        let nfa = b.compile(frag);
        let dfa = Builder::new().build(&nfa).unwrap();
        let mut cache = dfa.create_cache();
        assert!(dfa.try_search_at(b"abd", 1, &mut cache));
        assert_eq!(cache.slots(), &[1, 3]);
    }

    #[test]
    fn out_of_bounds_start_is_no_match_not_panic() {
        let mut b = NfaBuilder::new();
        let frag = b.literal(b"a");
        let nfa = b.compile(frag);
        let dfa = Builder::new().build(&nfa).unwrap();
        let mut cache = dfa.create_cache();
        assert!(!dfa.try_search_at(b"a", 5, &mut cache));
    }
}
