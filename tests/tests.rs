//! End-to-end tests over the public API, exercised through
//! hand-assembled NFAs (this crate never parses regex syntax itself).
//!
//! Requires the `testutil` feature, which exposes
//! `regex_kernel::nfa::Builder`; run with
//! `cargo test --features testutil`.

use regex_kernel::nfa::Builder as NfaBuilder;
use regex_kernel::onepass::Builder as OnePassBuilder;
use regex_kernel::teddy::Teddy;

// `(\d+)-(\d+)` on "123-456".
#[test]
fn captures_two_numeric_groups_separated_by_dash() {
    let mut b = NfaBuilder::new();
    let g1 = {
        let d = b.byte_range(b'0', b'9');
        let run = b.plus(d);
        b.capture(run)
    };
    let dash = b.byte(b'-');
    let g2 = {
        let d = b.byte_range(b'0', b'9');
        let run = b.plus(d);
        b.capture(run)
    };
    let head = b.concat(g1, dash);
    let frag = b.concat(head, g2);
    let nfa = b.compile(frag);

    let dfa = OnePassBuilder::new().build(&nfa).expect("one-pass build");
    let mut cache = dfa.create_cache();
    assert!(dfa.try_search(b"123-456", &mut cache));
    assert_eq!(cache.slots(), &[0, 7, 0, 3, 4, 7]);
}

// `([a-z]+)\s+([a-z]+)` on "hello world".
#[test]
fn captures_two_words_separated_by_spaces() {
    let mut b = NfaBuilder::new();
    let g1 = {
        let w = b.byte_range(b'a', b'z');
        let run = b.plus(w);
        b.capture(run)
    };
    let space = {
        let s = b.byte(b' ');
        b.plus(s)
    };
    let g2 = {
        let w = b.byte_range(b'a', b'z');
        let run = b.plus(w);
        b.capture(run)
    };
    let head = b.concat(g1, space);
    let frag = b.concat(head, g2);
    let nfa = b.compile(frag);

    let dfa = OnePassBuilder::new().build(&nfa).expect("one-pass build");
    let mut cache = dfa.create_cache();
    assert!(dfa.try_search(b"hello world", &mut cache));
    assert_eq!(cache.slots(), &[0, 11, 0, 5, 6, 11]);
}

// `(\d+)-(\d+)-(\d+)` on "2025-11-28".
#[test]
fn captures_three_numeric_groups_separated_by_dashes() {
    let mut b = NfaBuilder::new();
    let group = |b: &mut NfaBuilder| {
        let d = b.byte_range(b'0', b'9');
        let run = b.plus(d);
        b.capture(run)
    };
    let g1 = group(&mut b);
    let dash1 = b.byte(b'-');
    let g2 = group(&mut b);
    let dash2 = b.byte(b'-');
    let g3 = group(&mut b);

    let f = b.concat(g1, dash1);
    let f = b.concat(f, g2);
    let f = b.concat(f, dash2);
    let frag = b.concat(f, g3);
    let nfa = b.compile(frag);

    let dfa = OnePassBuilder::new().build(&nfa).expect("one-pass build");
    let mut cache = dfa.create_cache();
    assert!(dfa.try_search(b"2025-11-28", &mut cache));
    assert_eq!(cache.slots(), &[0, 10, 0, 4, 5, 7, 8, 10]);
}

// `a(b|c)d` matches "abd" with group 1 == "b"; does not match "aad".
#[test]
fn alternation_inside_capture_group() {
    let mut b = NfaBuilder::new();
    let left = b.byte(b'b');
    let right = b.byte(b'c');
    let alt = b.alternate(left, right);
    let group = b.capture(alt);
    let a = b.byte(b'a');
    let d = b.byte(b'd');
    let ad = b.concat(a, group);
    let frag = b.concat(ad, d);
    let nfa = b.compile(frag);

    let dfa = OnePassBuilder::new().build(&nfa).expect("one-pass build");
    let mut cache = dfa.create_cache();
    assert!(dfa.try_search(b"abd", &mut cache));
    assert_eq!(cache.slots(), &[0, 3, 1, 2]);
    assert!(!dfa.try_is_match(b"aad"));
}

// `a*a` is not one-pass.
#[test]
fn ambiguous_star_then_literal_is_rejected() {
    let mut b = NfaBuilder::new();
    let inner = b.byte(b'a');
    let star = b.star(inner);
    let tail = b.byte(b'a');
    let frag = b.concat(star, tail);
    let nfa = b.compile(frag);

    assert!(regex_kernel::onepass::is_one_pass(&nfa));
    let err = OnePassBuilder::new().build(&nfa).unwrap_err();
    assert!(err.is_not_one_pass());
}

fn lit<'a>(strs: &'a [&'a str]) -> Vec<&'a [u8]> {
    strs.iter().map(|s| s.as_bytes()).collect()
}

// A slim Teddy instance built over a small literal set finds the one
// present in the haystack and reports no match when none occur.
#[test]
fn teddy_finds_leftmost_of_three_literals() {
    let patterns = lit(&["foo", "bar", "baz"]);
    let teddy = Teddy::new(&patterns).expect("slim teddy builds");
    assert_eq!(teddy.find(b"hello bar world", 0), Some(6));
    assert_eq!(teddy.find(b"hello world", 0), None);
}

// Resuming a search past the first match's start finds the next
// occurrence of a different literal further along the haystack.
#[test]
fn teddy_finds_successive_matches_when_resumed() {
    let patterns = lit(&["ERROR", "WARNING"]);
    let teddy = Teddy::new(&patterns).expect("slim teddy builds");
    let hay =
        b"INFO: all good\nERROR: something broke\nWARNING: check this";
    let first = teddy.find(hay, 0).expect("first match");
    assert_eq!(first, 15);
    let second = teddy.find(hay, first + 1).expect("second match");
    assert_eq!(second, 38);
}

// Forty patterns force the fat (256-bit bucket) variant, which must
// still report correct match bounds.
#[test]
fn fat_teddy_finds_match_among_forty_patterns() {
    let owned: Vec<String> = (0..40).map(|i| format!("pat{i:03}")).collect();
    let patterns: Vec<&[u8]> = owned.iter().map(|s| s.as_bytes()).collect();
    let teddy = Teddy::new(&patterns).expect("fat teddy builds");

    let mut hay = vec![b'.'; 64];
    hay[20..26].copy_from_slice(b"pat010");
    let span = teddy.find_match(&hay, 0).expect("match found");
    assert_eq!(span.start, 20);
    assert_eq!(span.end - span.start, 6);
    assert_eq!(teddy.literal_len(), 6);
}

// Teddy's leftmost match must agree with a brute-force scan over every
// pattern, across a range of haystacks.
#[test]
fn teddy_matches_brute_force_leftmost_across_haystacks() {
    let patterns = lit(&["needle", "pin", "thread", "fabric"]);
    let teddy = Teddy::new(&patterns).unwrap();

    let haystacks: &[&[u8]] = &[
        b"",
        b"a",
        b"no match in here at all, nothing, zero",
        b"a needle and a pin in a fabric of thread",
        b"threadbare fabric with a needle",
        b"xxxxxxxxxxxxxxxxpinxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    ];
    for hay in haystacks {
        let expected = ["needle", "pin", "thread", "fabric"]
            .iter()
            .filter_map(|p| {
                hay.windows(p.len()).position(|w| w == p.as_bytes())
            })
            .min();
        assert_eq!(teddy.find(hay, 0), expected, "haystack {hay:?}");
    }
}

// Boundary behavior: inputs spanning the SIMD chunk boundaries (16,
// 17, 32, 33, 64, 65 bytes) must still find a literal placed at the
// very end of the haystack, regardless of which kernel the running
// machine dispatches to.
#[test]
fn teddy_finds_match_across_chunk_boundaries() {
    let patterns = lit(&["end"]);
    let teddy = Teddy::new(&patterns).unwrap();
    for len in [16usize, 17, 32, 33, 64, 65] {
        let mut hay = vec![b'.'; len];
        let start = len - 3;
        hay[start..].copy_from_slice(b"end");
        assert_eq!(teddy.find(&hay, 0), Some(start), "len {len}");
    }
}

// Cache idempotence (property 3): back-to-back searches against the
// same cache produce identical outputs, and a reset cache looks like a
// freshly allocated one.
#[test]
fn cache_reuse_is_idempotent() {
    let mut b = NfaBuilder::new();
    let frag = b.literal(b"abc");
    let nfa = b.compile(frag);
    let dfa = OnePassBuilder::new().build(&nfa).unwrap();
    let mut cache = dfa.create_cache();

    assert!(dfa.try_search(b"abc", &mut cache));
    let first = cache.slots().to_vec();
    assert!(dfa.try_search(b"abc", &mut cache));
    let second = cache.slots().to_vec();
    assert_eq!(first, second);

    let fresh = dfa.create_cache();
    cache.reset();
    assert_eq!(cache.slots(), fresh.slots());
}

// Boundary behavior: 16 explicit captures builds; 17 does not.
#[test]
fn capture_budget_boundary() {
    let mut b = NfaBuilder::new();
    let a0 = b.byte(b'a');
    let mut frag = b.capture(a0);
    for _ in 0..15 {
        let a = b.byte(b'a');
        let next = b.capture(a);
        frag = b.concat(frag, next);
    }
    let nfa16 = b.compile(frag);
    assert!(OnePassBuilder::new().build(&nfa16).is_ok());

    let mut b = NfaBuilder::new();
    let a0 = b.byte(b'a');
    let mut frag = b.capture(a0);
    for _ in 0..16 {
        let a = b.byte(b'a');
        let next = b.capture(a);
        frag = b.concat(frag, next);
    }
    let nfa17 = b.compile(frag);
    let err = OnePassBuilder::new().build(&nfa17).unwrap_err();
    assert!(err.is_too_many_captures());
}
