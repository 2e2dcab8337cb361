/*!
A SIMD-accelerated multi-literal prefilter ("Teddy").

Given 2 to 64 literal byte strings, each at least 3 bytes long, builds a
set of nibble lookup tables keyed by a short byte "fingerprint" at the
start of each literal and a bucket assignment (pattern index modulo
bucket count). Scanning the haystack then reduces to, at every position,
looking up the fingerprint bytes in those tables and combining the
results with a bitwise AND: any nonzero lane names the buckets whose
member patterns are *consistent* with the bytes seen there, which then
have to be checked for real by direct comparison.

Two variants exist, matched to vector width:

- **Slim**: 2–32 patterns, 8 buckets (one per bit of a byte), 128-bit
  (SSSE3) lookups.
- **Fat**: 33–64 patterns, 16 buckets, 256-bit (AVX2) lookups. The extra
  8 buckets are carried as a second, parallel set of nibble tables
  (`group1`) rather than widening every table to 16 bits; the two
  8-bit results are then packed into one 16-bit candidate mask.

Construction never fails in the sense of returning an error: patterns
outside the supported count, or any literal shorter than 3 bytes,
simply produce `None` from [`Teddy::new`], and the caller falls back to
something else (`memchr`/`memmem`, or a full scan).

On any platform, or for haystacks too short to fill a vector chunk, a
portable scalar reimplementation of the same nibble-lookup algorithm
(not a naive per-position memcmp) stands in for the SIMD kernels and
is required to report bit-identical candidates.
*/

use alloc::{boxed::Box, vec, vec::Vec};

use crate::util::search::Span;

/// Literals shorter than this are not worth the fingerprint machinery.
pub const MIN_LITERAL_LEN: usize = 3;

/// Slim Teddy covers `[MIN_SLIM_PATTERNS, MAX_SLIM_PATTERNS]` patterns.
pub const MIN_SLIM_PATTERNS: usize = 2;
pub const MAX_SLIM_PATTERNS: usize = 32;

/// Fat Teddy covers `(MAX_SLIM_PATTERNS, MAX_FAT_PATTERNS]` patterns.
pub const MAX_FAT_PATTERNS: usize = 64;

/// Configuration for [`Builder`].
///
/// Every option defaults to the behavior a normal caller wants; the
/// non-default setting exists for forcing the wider variant independent
/// of pattern count.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    force_fat: Option<bool>,
}

impl Config {
    /// Create a default configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// When `true`, always build the fat (256-bit bucket) variant, even
    /// for a pattern count that would otherwise fit the slim variant.
    /// Has no effect on patterns counts above [`MAX_SLIM_PATTERNS`],
    /// which always build fat regardless of this setting.
    pub fn force_fat(mut self, yes: bool) -> Config {
        self.force_fat = Some(yes);
        self
    }

    /// Returns the configured `force_fat` setting, or its default
    /// (`false`) if unset.
    pub fn get_force_fat(&self) -> bool {
        self.force_fat.unwrap_or(false)
    }
}

/// Builds a [`Teddy`] prefilter from a set of literal patterns.
#[derive(Clone, Copy, Debug, Default)]
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

    /// Attempt to build a Teddy prefilter over `patterns`.
    ///
    /// Returns `None` under the same conditions as [`Teddy::new`]. With
    /// [`Config::force_fat`] set, the fat variant is built even when
    /// `patterns` would otherwise fit the slim one.
    pub fn build(&self, patterns: &[&[u8]]) -> Option<Teddy> {
        Teddy::build(patterns, self.config.get_force_fat())
    }
}

const SLIM_BUCKETS: usize = 8;
const FAT_BUCKETS: usize = 16;
const SLIM_CHUNK: usize = 16;
const FAT_CHUNK: usize = 32;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Variant {
    Slim,
    Fat,
}

impl Variant {
    fn bucket_count(self) -> usize {
        match self {
            Variant::Slim => SLIM_BUCKETS,
            Variant::Fat => FAT_BUCKETS,
        }
    }
}

/// A pair of 32-byte nibble lookup tables for one fingerprint position.
///
/// `lo`/`hi` are indexed by the low/high nibble of a haystack byte. Each
/// entry is a bitmask of the buckets that have some member pattern with
/// that nibble at this position. The first 16 bytes of each table are
/// duplicated into the second 16 so a 256-bit `vpshufb` can address
/// either 128-bit lane with the same table.
#[derive(Clone)]
struct Mask {
    lo: [u8; 32],
    hi: [u8; 32],
}

impl Mask {
    fn empty() -> Mask {
        Mask { lo: [0; 32], hi: [0; 32] }
    }

    fn add(&mut self, byte: u8, bucket_bit: u8) {
        let lo_nib = (byte & 0x0F) as usize;
        let hi_nib = (byte >> 4) as usize;
        self.lo[lo_nib] |= bucket_bit;
        self.lo[lo_nib + 16] |= bucket_bit;
        self.hi[hi_nib] |= bucket_bit;
        self.hi[hi_nib + 16] |= bucket_bit;
    }
}

/// The full set of nibble tables for one Teddy instance: one [`Mask`]
/// per fingerprint position for buckets 0–7, and — for the fat variant
/// only — a second parallel set for buckets 8–15.
struct Masks {
    group0: Vec<Mask>,
    group1: Option<Vec<Mask>>,
}

impl Masks {
    fn build(
        variant: Variant,
        fp_len: usize,
        patterns: &[&[u8]],
        buckets: &[Vec<u32>],
    ) -> Masks {
        let mut group0 = vec![Mask::empty(); fp_len];
        let mut group1 = match variant {
            Variant::Fat => Some(vec![Mask::empty(); fp_len]),
            Variant::Slim => None,
        };
        for (b, ids) in buckets.iter().enumerate() {
            let (group, bit) = if b < 8 {
                (&mut group0, 1u8 << b)
            } else {
                (
                    group1.as_mut().expect("fat variant carries >8 buckets"),
                    1u8 << (b - 8),
                )
            };
            for &id in ids {
                let pat = patterns[id as usize];
                for (p, mask) in group.iter_mut().enumerate() {
                    mask.add(pat[p], bit);
                }
            }
        }
        Masks { group0, group1 }
    }

    fn heap_bytes(&self) -> usize {
        let per_mask = core::mem::size_of::<Mask>();
        self.group0.len() * per_mask
            + self.group1.as_ref().map_or(0, |g| g.len() * per_mask)
    }
}

/// A compiled multi-literal prefilter. See the module docs.
pub struct Teddy {
    patterns: Vec<Box<[u8]>>,
    buckets: Vec<Vec<u32>>,
    fp_len: usize,
    variant: Variant,
    masks: Masks,
    min_len: usize,
    uniform_len: usize,
}

impl Teddy {
    /// Build a Teddy prefilter over `patterns`, or return `None` if the
    /// pattern count falls outside `2..=64` or any pattern is shorter
    /// than [`MIN_LITERAL_LEN`].
    ///
    /// Patterns are copied; the returned `Teddy` does not borrow from
    /// `patterns` or its elements.
    pub fn new(patterns: &[&[u8]]) -> Option<Teddy> {
        Teddy::build(patterns, false)
    }

    /// Like [`Teddy::new`], but always builds the fat (256-bit bucket)
    /// variant, even when `patterns` would otherwise fit the slim one.
    pub fn new_fat(patterns: &[&[u8]]) -> Option<Teddy> {
        Teddy::build(patterns, true)
    }

    fn build(patterns: &[&[u8]], force_fat: bool) -> Option<Teddy> {
        let n = patterns.len();
        if n < MIN_SLIM_PATTERNS || n > MAX_FAT_PATTERNS {
            return None;
        }
        if patterns.iter().any(|p| p.len() < MIN_LITERAL_LEN) {
            return None;
        }
        let variant = if n <= MAX_SLIM_PATTERNS && !force_fat {
            Variant::Slim
        } else {
            Variant::Fat
        };
        let bucket_count = variant.bucket_count();
        let min_len = patterns.iter().map(|p| p.len()).min().unwrap();
        // Slim prefers a 2-byte fingerprint whenever the shortest
        // literal supports it; fat always uses two bytes.
        let fp_len = match variant {
            Variant::Slim if min_len >= 2 => 2,
            Variant::Slim => 1,
            Variant::Fat => 2,
        };

        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); bucket_count];
        for (i, _) in patterns.iter().enumerate() {
            buckets[i % bucket_count].push(i as u32);
        }

        let masks = Masks::build(variant, fp_len, patterns, &buckets);
        let uniform_len = {
            let first = patterns[0].len();
            if patterns.iter().all(|p| p.len() == first) { first } else { 0 }
        };
        let owned =
            patterns.iter().map(|p| Box::<[u8]>::from(*p)).collect();

        Some(Teddy {
            patterns: owned,
            buckets,
            fp_len,
            variant,
            masks,
            min_len,
            uniform_len,
        })
    }

    /// Find the leftmost position at or after `start` where some
    /// pattern occurs, or `None` if no pattern occurs.
    pub fn find(&self, haystack: &[u8], start: usize) -> Option<usize> {
        self.find_match(haystack, start).map(|s| s.start)
    }

    /// Find the leftmost match at or after `start`, returning its span.
    pub fn find_match(&self, haystack: &[u8], start: usize) -> Option<Span> {
        if haystack.len().saturating_sub(start) < self.min_len {
            return None;
        }
        let mut pos = start;
        loop {
            let (cand, mask) = self.next_candidate(haystack, pos)?;
            if let Some(m) = self.verify(haystack, cand, mask) {
                return Some(m);
            }
            // Leftmost semantics over overlapping literals require
            // resuming one byte past a failed candidate, not skipping
            // ahead by the shortest pattern length.
            pos = cand + 1;
        }
    }

    /// Always `true`: `find`/`find_match` verify every candidate by
    /// direct byte comparison, so callers never need a second pass.
    pub fn is_complete(&self) -> bool {
        true
    }

    /// The common length of every pattern, or `0` if they differ.
    pub fn literal_len(&self) -> usize {
        self.uniform_len
    }

    /// Approximate owned memory, for budgeting alongside a DFA.
    pub fn heap_bytes(&self) -> usize {
        let patterns: usize = self.patterns.iter().map(|p| p.len()).sum();
        let buckets: usize = self
            .buckets
            .iter()
            .map(|b| b.len() * core::mem::size_of::<u32>())
            .sum();
        patterns + buckets + self.masks.heap_bytes()
    }

    fn verify(
        &self,
        haystack: &[u8],
        pos: usize,
        bucket_mask: u32,
    ) -> Option<Span> {
        let mut bits = bucket_mask;
        while bits != 0 {
            let b = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            for &id in &self.buckets[b] {
                let pat: &[u8] = &self.patterns[id as usize];
                let end = pos + pat.len();
                if end <= haystack.len() && &haystack[pos..end] == pat {
                    return Some(Span::new(pos, end));
                }
            }
        }
        None
    }

    /// Dispatches to a SIMD kernel when one is available for this
    /// platform and the variant in play, falling back to
    /// [`Teddy::find_scalar_candidate`] otherwise. The scalar path is
    /// also what every SIMD kernel finishes its tail with.
    fn next_candidate(
        &self,
        haystack: &[u8],
        start: usize,
    ) -> Option<(usize, u32)> {
        #[cfg(all(feature = "std", target_arch = "x86_64"))]
        {
            match self.variant {
                Variant::Fat => {
                    if std::is_x86_feature_detected!("avx2") {
                        // SAFETY: avx2 support just confirmed at runtime.
                        return unsafe {
                            self.next_candidate_avx2(haystack, start)
                        };
                    }
                }
                Variant::Slim => {
                    if std::is_x86_feature_detected!("ssse3") {
                        // SAFETY: ssse3 support just confirmed at runtime.
                        return unsafe {
                            self.next_candidate_ssse3(haystack, start)
                        };
                    }
                }
            }
        }
        self.find_scalar_candidate(haystack, start)
    }

    /// The portable nibble-lookup reimplementation used on platforms
    /// without the relevant SIMD extension, for haystack tails too
    /// short to fill a vector chunk, and as the correctness oracle the
    /// SIMD kernels are tested against.
    fn find_scalar_candidate(
        &self,
        haystack: &[u8],
        start: usize,
    ) -> Option<(usize, u32)> {
        if self.fp_len == 0 || haystack.len() < self.fp_len {
            return None;
        }
        let last = haystack.len() - self.fp_len;
        for i in start..=last {
            let m0 = scalar_group_mask(&self.masks.group0, haystack, i);
            let mask: u32 = match &self.masks.group1 {
                Some(g1) => {
                    let m1 = scalar_group_mask(g1, haystack, i);
                    (u32::from(m1) << 8) | u32::from(m0)
                }
                None => u32::from(m0),
            };
            if mask != 0 {
                return Some((i, mask));
            }
        }
        None
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "ssse3")]
    unsafe fn next_candidate_ssse3(
        &self,
        haystack: &[u8],
        start: usize,
    ) -> Option<(usize, u32)> {
        use core::arch::x86_64::*;

        let fp_len = self.fp_len;
        let g0 = &self.masks.group0;
        let lo0 = _mm_loadu_si128(g0[0].lo.as_ptr() as *const __m128i);
        let hi0 = _mm_loadu_si128(g0[0].hi.as_ptr() as *const __m128i);
        let (lo1, hi1) = if fp_len == 2 {
            (
                Some(_mm_loadu_si128(g0[1].lo.as_ptr() as *const __m128i)),
                Some(_mm_loadu_si128(g0[1].hi.as_ptr() as *const __m128i)),
            )
        } else {
            (None, None)
        };
        let nibble = _mm_set1_epi8(0x0F);
        let zero = _mm_setzero_si128();
        let len = haystack.len();
        let tail_guard = SLIM_CHUNK + fp_len - 1;

        let mut i = start;
        while i + tail_guard <= len {
            let v0 =
                _mm_loadu_si128(haystack.as_ptr().add(i) as *const __m128i);
            let idx_lo0 = _mm_and_si128(v0, nibble);
            let idx_hi0 = _mm_and_si128(_mm_srli_epi16(v0, 4), nibble);
            let mut r = _mm_and_si128(
                _mm_shuffle_epi8(lo0, idx_lo0),
                _mm_shuffle_epi8(hi0, idx_hi0),
            );
            if fp_len == 2 {
                let v1 = _mm_loadu_si128(
                    haystack.as_ptr().add(i + 1) as *const __m128i
                );
                let idx_lo1 = _mm_and_si128(v1, nibble);
                let idx_hi1 = _mm_and_si128(_mm_srli_epi16(v1, 4), nibble);
                let r1 = _mm_and_si128(
                    _mm_shuffle_epi8(lo1.unwrap(), idx_lo1),
                    _mm_shuffle_epi8(hi1.unwrap(), idx_hi1),
                );
                r = _mm_and_si128(r, r1);
            }
            let nonzero_lanes =
                (!(_mm_movemask_epi8(_mm_cmpeq_epi8(r, zero)) as u32))
                    & 0xFFFF;
            if nonzero_lanes != 0 {
                let lane = nonzero_lanes.trailing_zeros() as usize;
                let mut buf = [0u8; 16];
                _mm_storeu_si128(buf.as_mut_ptr() as *mut __m128i, r);
                return Some((i + lane, u32::from(buf[lane])));
            }
            i += SLIM_CHUNK;
        }
        self.find_scalar_candidate(haystack, i)
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "avx2")]
    unsafe fn next_candidate_avx2(
        &self,
        haystack: &[u8],
        start: usize,
    ) -> Option<(usize, u32)> {
        use core::arch::x86_64::*;

        let g0 = &self.masks.group0;
        let g1 = self
            .masks
            .group1
            .as_ref()
            .expect("fat variant always carries a second bucket group");
        let lo0_0 = _mm256_loadu_si256(g0[0].lo.as_ptr() as *const __m256i);
        let hi0_0 = _mm256_loadu_si256(g0[0].hi.as_ptr() as *const __m256i);
        let lo0_1 = _mm256_loadu_si256(g0[1].lo.as_ptr() as *const __m256i);
        let hi0_1 = _mm256_loadu_si256(g0[1].hi.as_ptr() as *const __m256i);
        let lo1_0 = _mm256_loadu_si256(g1[0].lo.as_ptr() as *const __m256i);
        let hi1_0 = _mm256_loadu_si256(g1[0].hi.as_ptr() as *const __m256i);
        let lo1_1 = _mm256_loadu_si256(g1[1].lo.as_ptr() as *const __m256i);
        let hi1_1 = _mm256_loadu_si256(g1[1].hi.as_ptr() as *const __m256i);

        let nibble = _mm256_set1_epi8(0x0F);
        let zero = _mm256_setzero_si256();
        let len = haystack.len();
        let tail_guard = FAT_CHUNK + self.fp_len - 1;

        let mut i = start;
        while i + tail_guard <= len {
            let v0 = _mm256_loadu_si256(
                haystack.as_ptr().add(i) as *const __m256i
            );
            let v1 = _mm256_loadu_si256(
                haystack.as_ptr().add(i + 1) as *const __m256i
            );
            let idx_lo0 = _mm256_and_si256(v0, nibble);
            let idx_hi0 = _mm256_and_si256(_mm256_srli_epi16(v0, 4), nibble);
            let idx_lo1 = _mm256_and_si256(v1, nibble);
            let idx_hi1 = _mm256_and_si256(_mm256_srli_epi16(v1, 4), nibble);

            let r0 = _mm256_and_si256(
                _mm256_and_si256(
                    _mm256_shuffle_epi8(lo0_0, idx_lo0),
                    _mm256_shuffle_epi8(hi0_0, idx_hi0),
                ),
                _mm256_and_si256(
                    _mm256_shuffle_epi8(lo0_1, idx_lo1),
                    _mm256_shuffle_epi8(hi0_1, idx_hi1),
                ),
            );
            let r1 = _mm256_and_si256(
                _mm256_and_si256(
                    _mm256_shuffle_epi8(lo1_0, idx_lo0),
                    _mm256_shuffle_epi8(hi1_0, idx_hi0),
                ),
                _mm256_and_si256(
                    _mm256_shuffle_epi8(lo1_1, idx_lo1),
                    _mm256_shuffle_epi8(hi1_1, idx_hi1),
                ),
            );

            let combined = _mm256_or_si256(r0, r1);
            let nonzero_lanes = (!(_mm256_movemask_epi8(_mm256_cmpeq_epi8(
                combined, zero,
            )) as u32))
                & 0xFFFF_FFFF;
            if nonzero_lanes != 0 {
                let lane = nonzero_lanes.trailing_zeros() as usize;
                let mut buf0 = [0u8; 32];
                let mut buf1 = [0u8; 32];
                _mm256_storeu_si256(buf0.as_mut_ptr() as *mut __m256i, r0);
                _mm256_storeu_si256(buf1.as_mut_ptr() as *mut __m256i, r1);
                let mask = u32::from(buf0[lane])
                    | (u32::from(buf1[lane]) << 8);
                return Some((i + lane, mask));
            }
            i += FAT_CHUNK;
        }
        self.find_scalar_candidate(haystack, i)
    }
}

fn scalar_group_mask(group: &[Mask], haystack: &[u8], i: usize) -> u8 {
    let mut acc = 0xFFu8;
    for (p, mask) in group.iter().enumerate() {
        let byte = haystack[i + p];
        let r = mask.lo[(byte & 0x0F) as usize]
            & mask.hi[(byte >> 4) as usize];
        acc &= r;
    }
    acc
}
