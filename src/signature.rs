//! Runtime signatures: bitsets over one manager's component vocabulary.

use std::fmt;

/// A fixed-width bitset classifying which components an entity possesses.
///
/// Bit *i* corresponds to the *i*-th component of the owning manager's
/// flattened vocabulary. Signatures of different managers have different
/// widths and must not be compared.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    words: Box<[u64]>,
}

impl Signature {
    /// Creates an all-zero signature wide enough for `bits` components.
    pub fn empty(bits: usize) -> Self {
        let words = vec![0; bits.div_ceil(64)].into_boxed_slice();

        Self { words }
    }

    /// Sets the bit for a component index.
    pub fn set(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    /// Returns `true` if the bit for a component index is set.
    pub fn test(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word >> (index % 64) & 1 == 1)
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    pub fn contains_all(&self, other: &Signature) -> bool {
        debug_assert_eq!(self.words.len(), other.words.len());

        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// The amount of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns an iterator over the set bit indices, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;

            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }

                let next = bits.trailing_zeros() as usize;

                bits &= bits - 1;

                Some(base + next)
            })
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_test() {
        let mut signature = Signature::empty(130);

        signature.set(0);
        signature.set(65);
        signature.set(129);

        assert!(signature.test(0));
        assert!(!signature.test(1));
        assert!(signature.test(65));
        assert!(signature.test(129));

        assert_eq!(signature.count_ones(), 3);
        assert_eq!(signature.ones().collect::<Vec<_>>(), [0, 65, 129]);
    }

    #[test]
    fn superset_matching() {
        let mut entity = Signature::empty(8);
        let mut wanted = Signature::empty(8);

        entity.set(1);
        entity.set(3);
        entity.set(5);

        wanted.set(1);
        wanted.set(5);

        assert!(entity.contains_all(&wanted));
        assert!(!wanted.contains_all(&entity));

        wanted.set(2);

        assert!(!entity.contains_all(&wanted));
    }

    #[test]
    fn empty_signature_matches_everything() {
        let entity = Signature::empty(8);
        let wanted = Signature::empty(8);

        assert!(entity.contains_all(&wanted));
    }
}
