//! Coefficients of the fitted linear model.
//!
//! The on-disk table is a CSV with `feature` and `weight` columns. Feature
//! names are `intercept`, `GC_content`, one zero-based position per guide
//! base (`"0"`, `"1"`, ...) and one code per ordered substitution (`"AG"`
//! for A replaced by G). Everything except the position count is checked
//! here, once, so scoring only has positions left to look up.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::files::open_reader;
use crate::sequence::{base_index, BASES};

pub const INTERCEPT: &str = "intercept";
pub const GC_CONTENT: &str = "GC_content";

/// Position keys at or above this are rejected; guides are a few dozen bases.
pub const MAX_POSITIONS: usize = 10_000;

#[derive(Debug, Deserialize)]
struct FeatureRow {
    feature: String,
    weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightTable {
    intercept: f64,
    position_weights: Vec<Option<f64>>,
    /// Indexed `[original][variant]` in `BASES` order; the diagonal is unused.
    pair_weights: [[f64; 4]; 4],
    gc_weight: f64,
}

impl WeightTable {
    /// Build from `(feature, weight)` pairs in any order.
    pub fn from_features<I, K>(features: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut intercept = None;
        let mut gc_weight = None;
        let mut pairs = [[None; 4]; 4];
        let mut positions: Vec<Option<f64>> = Vec::new();

        for (key, weight) in features {
            let key = key.as_ref().trim();
            if !seen.insert(key.to_string()) {
                return Err(Error::malformed(
                    "weight table",
                    format!("feature '{}' appears more than once", key),
                ));
            }

            if key == INTERCEPT {
                intercept = Some(weight);
            } else if key == GC_CONTENT {
                gc_weight = Some(weight);
            } else if let Some(pos) = parse_position(key)? {
                if positions.len() <= pos {
                    positions.resize(pos + 1, None);
                }
                positions[pos] = Some(weight);
            } else if let Some((from, to)) = parse_pair(key) {
                if from == to {
                    debug!("Ignoring identity substitution weight '{}'", key);
                } else {
                    pairs[from][to] = Some(weight);
                }
            } else {
                debug!("Ignoring unrecognized feature '{}'", key);
            }
        }

        let intercept = intercept.ok_or_else(|| Error::MissingWeight(INTERCEPT.to_string()))?;
        let gc_weight = gc_weight.ok_or_else(|| Error::MissingWeight(GC_CONTENT.to_string()))?;

        let mut pair_weights = [[0.0; 4]; 4];
        for from in 0..4 {
            for to in 0..4 {
                if from == to {
                    continue;
                }
                pair_weights[from][to] = pairs[from][to].ok_or_else(|| {
                    Error::MissingWeight(format!(
                        "{}{}",
                        char::from(BASES[from]),
                        char::from(BASES[to])
                    ))
                })?;
            }
        }

        Ok(WeightTable {
            intercept,
            position_weights: positions,
            pair_weights,
            gc_weight,
        })
    }

    /// Parse a comma-separated table. `source_name` only labels errors.
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| Error::malformed(source_name, e.to_string()))?
            .clone();
        for column in ["feature", "weight"] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::malformed(
                    source_name,
                    format!("missing required column '{}'", column),
                ));
            }
        }

        let mut features = Vec::new();
        for (idx, row) in rdr.deserialize::<FeatureRow>().enumerate() {
            let row = row.map_err(|e| {
                Error::malformed(source_name, format!("row {}: {}", idx + 1, e))
            })?;
            if !row.weight.is_finite() {
                return Err(Error::malformed(
                    source_name,
                    format!("row {}: weight for '{}' is not finite", idx + 1, row.feature),
                ));
            }
            features.push((row.feature, row.weight));
        }

        let table = Self::from_features(features)?;
        info!(
            "Loaded weight table from {} ({} position weights)",
            source_name,
            table.position_weights.iter().filter(|w| w.is_some()).count()
        );
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_reader(path)?;
        Self::from_reader(reader, &path.display().to_string())
    }

    #[inline(always)]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    #[inline(always)]
    pub fn gc_weight(&self) -> f64 {
        self.gc_weight
    }

    /// Penalty for a substitution at zero-based `pos`.
    pub fn position_weight(&self, pos: usize) -> Result<f64> {
        self.position_weights
            .get(pos)
            .copied()
            .flatten()
            .ok_or_else(|| Error::MissingWeight(pos.to_string()))
    }

    /// Penalty for replacing `from` with `to`. `None` for identical or
    /// non-canonical bases.
    pub fn pair_weight(&self, from: u8, to: u8) -> Option<f64> {
        let (from, to) = (base_index(from)?, base_index(to)?);
        if from == to {
            None
        } else {
            Some(self.pair_weights[from][to])
        }
    }

    /// Fail early if any position in `0..len` has no weight.
    pub fn require_positions(&self, len: usize) -> Result<()> {
        for pos in 0..len {
            self.position_weight(pos)?;
        }
        Ok(())
    }
}

/// `Some(pos)` for a canonical decimal position, `None` for keys that are
/// not numeric at all. Numeric keys with a sign, leading zeros or a value
/// of `MAX_POSITIONS` or more are malformed.
fn parse_position(key: &str) -> Result<Option<usize>> {
    let digits = key.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let canonical = digits.len() == key.len() && (digits == "0" || !digits.starts_with('0'));
    let pos = digits.parse::<usize>().ok().filter(|&p| p < MAX_POSITIONS);
    match pos {
        Some(pos) if canonical => Ok(Some(pos)),
        _ => Err(Error::malformed(
            "weight table",
            format!(
                "position feature '{}' must be a plain integer below {}",
                key, MAX_POSITIONS
            ),
        )),
    }
}

fn parse_pair(key: &str) -> Option<(usize, usize)> {
    match key.as_bytes() {
        [from, to] => Some((base_index(*from)?, base_index(*to)?)),
        _ => None,
    }
}
