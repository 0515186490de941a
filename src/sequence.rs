use std::fmt;

use bio::alphabets::Alphabet;
use lazy_static::lazy_static;

use crate::error::{Error, Result};

/// The four canonical bases, in the order variants are enumerated.
pub const BASES: [u8; 4] = *b"ACGT";

lazy_static! {
    static ref CANONICAL: Alphabet = Alphabet::new(BASES.iter());
}

/// Index of a base in `BASES`, or `None` outside the canonical alphabet.
#[inline]
pub fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Reject empty sequences and anything outside A/C/G/T. `what` names the
/// sequence in the error message.
pub fn validate_sequence(seq: &[u8], what: &str) -> Result<()> {
    if seq.is_empty() {
        return Err(Error::invalid_input(format!("{} is empty", what)));
    }
    if CANONICAL.is_word(seq) {
        return Ok(());
    }
    // Slow path only to build the message
    let (pos, &bad) = seq
        .iter()
        .enumerate()
        .find(|(_, b)| !CANONICAL.is_word([**b]))
        .unwrap_or((0, &seq[0]));
    Err(Error::invalid_input(format!(
        "{} '{}' has invalid base '{}' at position {}",
        what,
        String::from_utf8_lossy(seq),
        char::from(bad).escape_default(),
        pos + 1
    )))
}

/// Fraction of G and C bases. An empty sequence is an error rather than NaN.
pub fn gc_content(seq: &[u8]) -> Result<f64> {
    if seq.is_empty() {
        return Err(Error::invalid_input(
            "GC content is undefined for an empty sequence",
        ));
    }
    let gc = seq.iter().filter(|&&b| b == b'G' || b == b'C').count() as f64;
    Ok(gc / seq.len() as f64)
}

/// A guide (spacer) sequence, checked once and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guide {
    seq: Vec<u8>,
}

impl Guide {
    pub fn new(seq: impl Into<Vec<u8>>) -> Result<Self> {
        let seq = seq.into();
        validate_sequence(&seq, "guide")?;
        Ok(Guide { seq })
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.seq
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Never true for a constructed guide.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn gc_content(&self) -> f64 {
        // Construction guarantees a non-empty sequence
        gc_content(&self.seq).unwrap_or(0.0)
    }
}

impl fmt::Display for Guide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // ACGT only, so this is always valid UTF-8
        write!(f, "{}", String::from_utf8_lossy(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_content_bounds() {
        assert_eq!(gc_content(b"ATATTA").unwrap(), 0.0);
        assert_eq!(gc_content(b"GCGGCC").unwrap(), 1.0);
        assert_eq!(gc_content(b"AG").unwrap(), 0.5);
        assert!((gc_content(b"AAAGGGTTTCCC").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_gc_content_empty_is_error() {
        assert!(matches!(gc_content(b""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_guide_validation() {
        assert!(Guide::new("ACGTACGT").is_ok());
        assert!(matches!(Guide::new(""), Err(Error::InvalidInput(_))));

        let err = Guide::new("ACGNT").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'N'"), "{}", msg);
        assert!(msg.contains("position 4"), "{}", msg);

        // Comparison is literal, lowercase is not accepted
        assert!(Guide::new("acgt").is_err());
    }

    #[test]
    fn test_base_index_matches_order() {
        for (i, &b) in BASES.iter().enumerate() {
            assert_eq!(base_index(b), Some(i));
        }
        assert_eq!(base_index(b'N'), None);
        assert_eq!(base_index(b'a'), None);
    }

    #[test]
    fn test_guide_display() {
        let guide = Guide::new("GATTACA").unwrap();
        assert_eq!(guide.to_string(), "GATTACA");
        assert_eq!(guide.len(), 7);
        assert!((guide.gc_content() - 2.0 / 7.0).abs() < 1e-12);
    }
}
