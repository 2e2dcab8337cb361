/*!
The packed 64-bit transition record.

Every other component in the one-pass DFA indexes into a flat array of
these: the transition table, the builder's work map during emission, and
the matcher's per-byte hot loop. The encoding is a hard contract (see the
bit layout below), not an implementation detail, because it is what lets
the table be a plain `Vec<Transition>` instead of a struct-of-arrays.

# Bit layout

```text
 63                43 42              32 31                          0
+--------------------+------------------+----------------------------+
|    next state      | mw |  look-around |        slot mask          |
|     (21 bits)       | 1b |   (10 bits)  |         (32 bits)         |
+--------------------+------------------+----------------------------+
```

- Bits 43–63: the next state id (21 bits, matching [`StateID::BITS`]).
- Bit 42: the match-wins flag, RE2-style leftmost-first acceptance.
- Bits 32–41: ten reserved look-around assertion bits. Not written by the
  builder and not consulted by the matcher; the field exists so a future
  builder can populate it without another format change. See the
  crate-level docs for why this is left inert rather than guessed at.
- Bits 0–31: the slot-update bitmask. Bit `i` set means "write the
  current input position into capture slot `i`" when this transition is
  taken.
*/

use core::fmt;

use crate::util::primitives::StateID;

const NEXT_SHIFT: u32 = 43;
const MATCH_WINS_SHIFT: u32 = 42;
const LOOK_SHIFT: u32 = 32;

const NEXT_MASK: u64 = (1u64 << 21) - 1;
const LOOK_MASK: u64 = (1u64 << 10) - 1;
const SLOT_MASK: u64 = (1u64 << 32) - 1;

/// A single packed transition in a [`OnePass`](crate::onepass::OnePass)
/// DFA's transition table.
///
/// This type has no public constructor that lets a caller hand-assemble
/// an arbitrary combination of fields outside the builder; the only way
/// to build one from scratch is [`Transition::new`], which takes every
/// field at once so the bit-packing is never partially applied.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Transition(u64);

impl Transition {
    /// The dead transition: `next_state == StateID::DEAD` and every other
    /// field zeroed. A table entry equal to this is never taken; the
    /// matcher stops the search the moment it sees one.
    pub const DEAD: Transition = Transition(0);

    /// Build a transition from its four logical fields.
    ///
    /// `next` must not exceed [`StateID::MAX`]; `look_around` and
    /// `slot_mask` are truncated to 10 and 32 bits respectively by the
    /// packing itself, so passing a wider value is not a panic, just a
    /// silent truncation (matching the "ignored beyond the budget"
    /// behavior the builder already relies on for slot accumulation).
    #[inline]
    pub fn new(
        next: StateID,
        match_wins: bool,
        look_around: u16,
        slot_mask: u32,
    ) -> Transition {
        let mut bits = (next.as_u32() as u64 & NEXT_MASK) << NEXT_SHIFT;
        if match_wins {
            bits |= 1 << MATCH_WINS_SHIFT;
        }
        bits |= (look_around as u64 & LOOK_MASK) << LOOK_SHIFT;
        bits |= slot_mask as u64 & SLOT_MASK;
        Transition(bits)
    }

    /// Returns true if and only if this transition is dead, i.e., its
    /// next-state field is `StateID::DEAD`.
    ///
    /// This is exactly equivalent to `self.next_state() ==
    /// StateID::DEAD`, not a separately tracked flag.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.next_state().is_dead()
    }

    /// The state this transition leads to.
    #[inline]
    pub fn next_state(&self) -> StateID {
        let id = (self.0 >> NEXT_SHIFT) & NEXT_MASK;
        StateID::new_unchecked(id as usize)
    }

    /// Returns true if and only if the match-wins bit is set: acceptance
    /// should terminate the search immediately upon entering a match
    /// state via this transition, rather than preferring a longer match.
    #[inline]
    pub fn is_match_wins(&self) -> bool {
        (self.0 >> MATCH_WINS_SHIFT) & 1 == 1
    }

    /// The ten reserved look-around bits. Always zero until a future
    /// builder assigns them meaning; see the crate-level open question.
    #[inline]
    pub fn look_around(&self) -> u16 {
        ((self.0 >> LOOK_SHIFT) & LOOK_MASK) as u16
    }

    /// The 32-bit slot-update mask: bit `i` set means capture slot `i`
    /// is written with the current position when this transition fires.
    #[inline]
    pub fn slot_mask(&self) -> u32 {
        (self.0 & SLOT_MASK) as u32
    }

    /// Returns a copy of this transition with its slot mask replaced.
    ///
    /// Used by the builder when two closure paths collide on the same
    /// byte class and their source slot masks must be OR'd together
    /// (see the one-pass transition-emission pass).
    #[inline]
    pub fn with_slot_mask(&self, slot_mask: u32) -> Transition {
        Transition::new(
            self.next_state(),
            self.is_match_wins(),
            self.look_around(),
            slot_mask,
        )
    }

    /// Returns a copy of this transition with its look-around bits
    /// replaced. Exposed for forward compatibility; nothing in this
    /// crate currently calls it with a nonzero value.
    #[inline]
    pub fn with_look_around(&self, look_around: u16) -> Transition {
        Transition::new(
            self.next_state(),
            self.is_match_wins(),
            look_around,
            self.slot_mask(),
        )
    }

    /// Write `pos` into every capture slot named by this transition's
    /// slot mask.
    ///
    /// Slot indices at or beyond `slots.len()` are silently ignored:
    /// the mask is 32 bits wide regardless of how many of those bits
    /// this particular pattern's capture count actually addresses.
    #[inline]
    pub fn update_slots(&self, slots: &mut [i64], pos: usize) {
        apply_slot_mask(self.slot_mask(), slots, pos);
    }
}

/// Write `pos` into every slot named by `mask`, ignoring out-of-range
/// bits. Shared by [`Transition::update_slots`] and
/// [`apply_match_slots`], since a match state's slot mask is stored and
/// applied the same way a transition's is, just at a different moment
/// (after the last byte rather than before the next one).
#[inline]
pub(crate) fn apply_slot_mask(mask: u32, slots: &mut [i64], pos: usize) {
    let mut bits = mask;
    while bits != 0 {
        let i = bits.trailing_zeros() as usize;
        if i < slots.len() {
            slots[i] = pos as i64;
        }
        bits &= bits - 1;
    }
}

/// Apply a match state's end-position slot mask.
///
/// This is a free function rather than a method on `Transition` because
/// a match state's slot mask is stored separately from any transition
/// (it lives on the DFA, keyed by state id, applied on acceptance rather
/// than on a transition firing).
#[inline]
pub(crate) fn apply_match_slots(mask: u32, slots: &mut [i64], pos: usize) {
    apply_slot_mask(mask, slots, pos);
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dead() {
            return write!(f, "Transition(DEAD)");
        }
        f.debug_struct("Transition")
            .field("next_state", &self.next_state())
            .field("match_wins", &self.is_match_wins())
            .field("look_around", &format_args!("{:#012b}", self.look_around()))
            .field("slot_mask", &format_args!("{:#034b}", self.slot_mask()))
            .finish()
    }
}
