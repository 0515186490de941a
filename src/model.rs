use crate::error::{Error, Result};
use crate::sequence::{gc_content, validate_sequence};
use crate::weights::WeightTable;

/// Predicted knockdown efficacy of `variant` relative to `original`.
///
/// intercept + sum over mismatching positions of (position weight + pair
/// weight) + GC weight * GC content of `original`. Any number of mismatches
/// is accepted; each adds independently.
pub fn score(original: &[u8], variant: &[u8], weights: &WeightTable) -> Result<f64> {
    validate_sequence(original, "original")?;
    validate_sequence(variant, "variant")?;
    if original.len() != variant.len() {
        return Err(Error::invalid_input(format!(
            "original '{}' ({} nt) and variant '{}' ({} nt) differ in length",
            String::from_utf8_lossy(original),
            original.len(),
            String::from_utf8_lossy(variant),
            variant.len()
        )));
    }

    let mut y_pred = weights.intercept();
    for (pos, (&from, &to)) in original.iter().zip(variant).enumerate() {
        if from == to {
            continue;
        }
        y_pred += weights.position_weight(pos)?;
        // Both sides were validated, so only identity could miss here
        y_pred += weights.pair_weight(from, to).ok_or_else(|| {
            Error::MissingWeight(format!("{}{}", char::from(from), char::from(to)))
        })?;
    }

    y_pred += weights.gc_weight() * gc_content(original)?;
    Ok(y_pred)
}
