use crate::error::Result;
use crate::model::score;
use crate::sequence::{Guide, BASES};
use crate::weights::WeightTable;

/// A single-base substitution of a guide. Only built by
/// `enumerate_variants`, so the position is always inside the guide it
/// came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Variant {
    pub(crate) position: usize,
    pub(crate) base: u8,
}

impl Variant {
    /// Zero-based position in the guide.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline(always)]
    pub fn base(&self) -> u8 {
        self.base
    }

    /// The guide with this substitution applied.
    ///
    /// # Panics
    ///
    /// If `guide` is shorter than the guide this variant was enumerated from.
    pub fn apply(&self, guide: &Guide) -> Vec<u8> {
        let mut seq = guide.as_bytes().to_vec();
        seq[self.position] = self.base;
        seq
    }

    /// Original base, 1-based position, new base: `A1G`.
    ///
    /// # Panics
    ///
    /// Same condition as [`Variant::apply`].
    pub fn describe(&self, guide: &Guide) -> String {
        format!(
            "{}{}{}",
            char::from(guide.as_bytes()[self.position]),
            self.position + 1,
            char::from(self.base)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredVariant {
    pub variant: Variant,
    pub score: f64,
}

/// Score every single-base substitution of `guide`.
///
/// Position-major, then A, C, G, T, skipping the guide's own base: always
/// `3 * guide.len()` entries. The matcher relies on this order for ties.
pub fn enumerate_variants(guide: &Guide, weights: &WeightTable) -> Result<Vec<ScoredVariant>> {
    let original = guide.as_bytes();
    let mut candidates = Vec::with_capacity(3 * original.len());
    let mut mutated = original.to_vec();

    for (position, &orig_base) in original.iter().enumerate() {
        for &base in BASES.iter() {
            if base == orig_base {
                continue;
            }
            mutated[position] = base;
            let y_pred = score(original, &mutated, weights)?;
            candidates.push(ScoredVariant {
                variant: Variant { position, base },
                score: y_pred,
            });
        }
        mutated[position] = orig_base;
    }

    Ok(candidates)
}
