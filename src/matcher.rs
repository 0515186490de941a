use crate::error::{Error, Result};
use crate::variants::ScoredVariant;

/// Absorbs the rounding in `(max - min) / step` so that `max` itself is
/// included when it lies on the grid.
const GRID_EPSILON: f64 = 1e-9;

/// Upper bound on the number of targets one range may produce.
pub const MAX_TARGETS: usize = 100_000;

/// `min, min + step, ...` up to and including `max`.
///
/// Each value is computed as `min + i * step` rather than accumulated.
pub fn desired_scores(min: f64, max: f64, step: f64) -> Result<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(Error::invalid_input(format!(
            "score range must be finite (min={}, max={}, step={})",
            min, max, step
        )));
    }
    if step <= 0.0 {
        return Err(Error::invalid_input(format!("step must be positive, got {}", step)));
    }
    if max < min {
        return Err(Error::invalid_input(format!(
            "max ({}) is smaller than min ({})",
            max, min
        )));
    }

    let steps = ((max - min) / step + GRID_EPSILON).floor();
    if !steps.is_finite() || steps >= MAX_TARGETS as f64 {
        return Err(Error::invalid_input(format!(
            "min={}, max={}, step={} gives more than {} target scores",
            min, max, step, MAX_TARGETS
        )));
    }
    let count = steps as usize + 1;
    Ok((0..count).map(|i| min + i as f64 * step).collect())
}

/// For each target in order, take the closest candidate not yet taken.
///
/// Ties keep the earlier candidate. A chosen candidate is never offered again,
/// so once every candidate is used the remaining targets get `None`.
pub fn select(targets: &[f64], candidates: &[ScoredVariant]) -> Vec<Option<ScoredVariant>> {
    let mut used = vec![false; candidates.len()];
    let mut selection = Vec::with_capacity(targets.len());

    for &target in targets {
        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let diff = (candidate.score - target).abs();
            match best {
                Some((_, best_diff)) if diff >= best_diff => {}
                _ => best = Some((idx, diff)),
            }
        }

        selection.push(best.map(|(idx, _)| {
            used[idx] = true;
            candidates[idx]
        }));
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Guide;
    use crate::variants::{enumerate_variants, Variant};
    use crate::weights::tests::example_table;

    fn candidate(position: usize, base: u8, score: f64) -> ScoredVariant {
        ScoredVariant {
            variant: Variant { position, base },
            score,
        }
    }

    #[test]
    fn test_desired_scores_inclusive() {
        let scores = desired_scores(0.0, 1.0, 0.5).unwrap();
        assert_eq!(scores, vec![0.0, 0.5, 1.0]);

        // 0.1 has no exact binary form
        let scores = desired_scores(0.0, 1.0, 0.1).unwrap();
        assert_eq!(scores.len(), 11);
        assert!((scores[10] - 1.0).abs() < 1e-12);

        let scores = desired_scores(0.0, 0.95, 0.1).unwrap();
        assert_eq!(scores.len(), 10);

        assert_eq!(desired_scores(0.3, 0.3, 0.1).unwrap(), vec![0.3]);
    }

    #[test]
    fn test_desired_scores_invalid() {
        assert!(desired_scores(0.0, 1.0, 0.0).is_err());
        assert!(desired_scores(0.0, 1.0, -0.1).is_err());
        assert!(desired_scores(1.0, 0.0, 0.1).is_err());
        assert!(desired_scores(f64::NAN, 1.0, 0.1).is_err());
    }

    #[test]
    fn test_desired_scores_tiny_step() {
        for step in [1e-300, 1e-12, 1e-6] {
            assert!(matches!(
                desired_scores(0.0, 1.0, step),
                Err(Error::InvalidInput(_))
            ));
        }
        // Largest grid still allowed
        let scores = desired_scores(0.0, (MAX_TARGETS - 1) as f64, 1.0).unwrap();
        assert_eq!(scores.len(), MAX_TARGETS);
    }

    #[test]
    fn test_worked_example_selection() {
        let guide = Guide::new("AG").unwrap();
        let candidates = enumerate_variants(&guide, &example_table()).unwrap();
        let chosen: Vec<Variant> = select(&[0.0, 0.5, 1.0], &candidates)
            .into_iter()
            .map(|s| s.unwrap().variant)
            .collect();
        assert_eq!(
            chosen,
            vec![
                Variant { position: 0, base: b'G' },
                Variant { position: 0, base: b'T' },
                Variant { position: 1, base: b'T' },
            ]
        );
    }

    #[test]
    fn test_tie_keeps_earliest() {
        let candidates = [
            candidate(0, b'C', 0.25),
            candidate(0, b'G', 0.75),
            candidate(0, b'T', 0.25),
        ];
        let picked = select(&[0.5, 0.5, 0.5], &candidates);
        let order: Vec<u8> = picked.iter().map(|p| p.unwrap().variant.base).collect();
        assert_eq!(order, vec![b'C', b'G', b'T']);
    }

    #[test]
    fn test_no_reuse_and_exhaustion() {
        let candidates = [candidate(0, b'C', 0.1), candidate(0, b'G', 0.9)];
        let picked = select(&[0.1, 0.1, 0.1, 0.1], &candidates);
        assert_eq!(picked[0].unwrap().variant.base, b'C');
        assert_eq!(picked[1].unwrap().variant.base, b'G');
        assert!(picked[2].is_none());
        assert!(picked[3].is_none());
    }

    #[test]
    fn test_unordered_targets() {
        let candidates = [
            candidate(0, b'C', 0.0),
            candidate(0, b'G', 0.5),
            candidate(0, b'T', 1.0),
        ];
        let picked = select(&[1.0, 0.0, 0.6], &candidates);
        let order: Vec<u8> = picked.iter().map(|p| p.unwrap().variant.base).collect();
        assert_eq!(order, vec![b'T', b'C', b'G']);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(select(&[], &[candidate(0, b'C', 0.0)]).is_empty());
        assert_eq!(select(&[0.5], &[]), vec![None]);
    }
}
