//! Deterministic pseudo-randomness for filler and variant selection.
//!
//! The determinism contract requires byte-identical output for identical
//! inputs, so nothing here touches ambient randomness. Seeds come from a
//! 32-bit string hash of caller-supplied ids (`hash = hash * 31 + charCode`
//! over UTF-16 code units, wrapped to a signed 32-bit int, absolute value),
//! and draws come from an explicit linear-congruential generator.

/// 32-bit string hash, Java style.
pub fn string_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

/// Seed for a filler pass, scoped to a page and optionally a section.
pub fn filler_seed(
    menu_id: &str,
    template_id: &str,
    page_index: usize,
    section_id: Option<&str>,
) -> u32 {
    let key = match section_id {
        Some(section) => format!("{menu_id}|{template_id}|{page_index}|{section}"),
        None => format!("{menu_id}|{template_id}|{page_index}"),
    };
    string_hash(&key)
}

/// A small explicit LCG (numerical-recipes constants).
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        SeededRng { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform-ish pick in `0..n`. `n` must be non-zero.
    pub fn next_below(&mut self, n: usize) -> usize {
        // High bits cycle better than low bits for an LCG.
        ((self.next_u32() >> 16) as usize) % n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        assert_eq!(string_hash("menu-1|grid|0"), string_hash("menu-1|grid|0"));
        assert_ne!(string_hash("menu-1|grid|0"), string_hash("menu-1|grid|1"));
    }

    #[test]
    fn hash_matches_java_reference() {
        // "abc" hashes to 96354 under the 31-multiplier scheme.
        assert_eq!(string_hash("abc"), 96354);
    }

    #[test]
    fn negative_hash_takes_absolute_value() {
        // A long string overflows into negative i32 territory; the seed is
        // still a well-defined absolute value.
        let h = string_hash("a-sufficiently-long-identifier-that-overflows");
        assert!(h <= i32::MAX as u32 + 1);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut rng = SeededRng::new(7);
        for _ in 0..100 {
            assert!(rng.next_below(5) < 5);
        }
    }

    #[test]
    fn section_scoping_changes_seed() {
        let base = filler_seed("m", "t", 0, None);
        let scoped = filler_seed("m", "t", 0, Some("c1"));
        assert_ne!(base, scoped);
    }
}
