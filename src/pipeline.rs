use std::io::{self, Read, Write};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::matcher::select;
use crate::model::score;
use crate::sequence::Guide;
use crate::variants::enumerate_variants;
use crate::weights::WeightTable;

pub const MISMATCH_HEADER: [&str; 4] = ["original", "variant", "change_description", "y_pred"];

/// One output line of the mismatch table.
#[derive(Clone, Debug, PartialEq)]
pub struct MismatchRow {
    pub original: String,
    pub variant: String,
    pub change_description: String,
    pub y_pred: f64,
}

/// Rows chosen for one guide, in target order.
#[derive(Clone, Debug)]
pub struct GuideDesign {
    pub guide: Guide,
    pub rows: Vec<MismatchRow>,
    /// Targets left without a variant because the pool ran dry
    pub unmatched: usize,
}

/// Enumerate and score all substitutions of `guide`, then pick one per target.
pub fn design_guide(guide: &Guide, weights: &WeightTable, targets: &[f64]) -> Result<GuideDesign> {
    weights.require_positions(guide.len())?;
    let candidates = enumerate_variants(guide, weights)?;
    let selection = select(targets, &candidates);

    let original = guide.to_string();
    let mut rows = Vec::with_capacity(selection.len());
    let mut unmatched = 0;
    for picked in selection {
        let Some(picked) = picked else {
            unmatched += 1;
            continue;
        };
        rows.push(MismatchRow {
            original: original.clone(),
            variant: String::from_utf8_lossy(&picked.variant.apply(guide)).into_owned(),
            change_description: picked.variant.describe(guide),
            y_pred: picked.score,
        });
    }

    Ok(GuideDesign {
        guide: guide.clone(),
        rows,
        unmatched,
    })
}

/// Guides share nothing but the weights, so they are designed in parallel.
/// Output order follows input order.
pub fn design_guides(guides: &[Guide], weights: &WeightTable, targets: &[f64]) -> Result<Vec<GuideDesign>> {
    let designs: Vec<GuideDesign> = guides
        .par_iter()
        .map(|guide| design_guide(guide, weights, targets))
        .collect::<Result<_>>()?;

    for design in &designs {
        debug!(
            "{}: {} variant(s) for {} target(s)",
            design.guide,
            design.rows.len(),
            targets.len()
        );
        if design.unmatched > 0 {
            warn!(
                "{}: only {} distinct variants exist, {} target(s) skipped",
                design.guide,
                3 * design.guide.len(),
                design.unmatched
            );
        }
    }
    Ok(designs)
}

/// Tab-separated table with a header line, `y_pred` at four decimals. With
/// `separate_guides` each guide's block is followed by an empty line.
pub fn write_mismatch_table<W: Write>(
    out: &mut W,
    designs: &[GuideDesign],
    separate_guides: bool,
) -> io::Result<()> {
    writeln!(out, "{}", MISMATCH_HEADER.join("\t"))?;
    for design in designs {
        for row in &design.rows {
            writeln!(
                out,
                "{}\t{}\t{}\t{:.4}",
                row.original, row.variant, row.change_description, row.y_pred
            )?;
        }
        if separate_guides {
            writeln!(out)?;
        }
    }
    out.flush()
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecalcSummary {
    pub rows: usize,
    /// Name of the column that received the new scores
    pub column: String,
    /// Rows whose recorded `y_pred` differs from the new value at four
    /// decimals; `None` when the input had no `y_pred` column
    pub changed: Option<usize>,
}

/// A re-scored table, held in memory until it is written.
#[derive(Clone, Debug)]
pub struct RecalcTable {
    pub headers: csv::StringRecord,
    pub records: Vec<csv::StringRecord>,
    pub summary: RecalcSummary,
}

/// Re-score existing (original, variant) pairs.
///
/// Reads a tab-separated table with at least `original` and `variant`
/// columns and returns it with one more column: `y_pred_new` when the
/// input already has `y_pred`, `y_pred` otherwise. A column that already
/// carries the target name is overwritten in place. Every row is scored
/// before anything is returned, so a bad row leaves nothing to write.
pub fn rescore_table<R: Read>(
    input: R,
    weights: &WeightTable,
    source_name: &str,
) -> Result<RecalcTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(input);

    let mut headers = rdr
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .clone();
    let column_index = |name: &str| headers.iter().position(|h| h == name);

    let original_idx = column_index("original")
        .ok_or_else(|| Error::malformed(source_name, "missing required column 'original'"))?;
    let variant_idx = column_index("variant")
        .ok_or_else(|| Error::malformed(source_name, "missing required column 'variant'"))?;
    let previous_idx = column_index("y_pred");
    let column = if previous_idx.is_some() { "y_pred_new" } else { "y_pred" };
    let target_idx = column_index(column);

    if target_idx.is_none() {
        headers.push_field(column);
    }

    info!("Calculating {} for each row of {}", column, source_name);
    let mut records = Vec::new();
    let mut changed = 0;
    for (idx, record) in rdr.records().enumerate() {
        let row_label = || format!("{} row {}", source_name, idx + 1);
        let record = record.map_err(|e| csv_error(source_name, e))?;
        let (Some(original), Some(variant)) = (record.get(original_idx), record.get(variant_idx))
        else {
            return Err(Error::malformed(row_label(), "too few fields"));
        };

        let y_pred = score(original.as_bytes(), variant.as_bytes(), weights).map_err(|e| match e {
            Error::InvalidInput(msg) => Error::invalid_input(format!("{}: {}", row_label(), msg)),
            other => other,
        })?;
        let formatted = format!("{:.4}", y_pred);

        if let Some(prev) = previous_idx.and_then(|i| record.get(i)) {
            let same = prev
                .trim()
                .parse::<f64>()
                .map(|p| format!("{:.4}", p) == formatted)
                .unwrap_or(false);
            if !same {
                changed += 1;
                debug!("{}: recorded y_pred {} now {}", row_label(), prev, formatted);
            }
        }

        let record: csv::StringRecord = match target_idx {
            Some(i) => record
                .iter()
                .enumerate()
                .map(|(j, field)| if j == i { formatted.as_str() } else { field })
                .collect(),
            None => {
                let mut record = record;
                record.push_field(&formatted);
                record
            }
        };
        records.push(record);
    }

    let summary = RecalcSummary {
        rows: records.len(),
        column: column.to_string(),
        changed: previous_idx.map(|_| changed),
    };
    Ok(RecalcTable {
        headers,
        records,
        summary,
    })
}

/// Write a re-scored table as tab-separated text.
pub fn write_recalc_table<W: Write>(output: W, table: &RecalcTable, dest_name: &str) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(output);
    wtr.write_record(&table.headers)
        .map_err(|e| csv_error(dest_name, e))?;
    for record in &table.records {
        wtr.write_record(record)
            .map_err(|e| csv_error(dest_name, e))?;
    }
    wtr.flush().map_err(|e| Error::io(dest_name, e))
}

/// `rescore_table` followed by `write_recalc_table`; `output` is untouched
/// unless every row scores.
pub fn recalculate<R: Read, W: Write>(
    input: R,
    output: W,
    weights: &WeightTable,
    source_name: &str,
) -> Result<RecalcSummary> {
    let table = rescore_table(input, weights, source_name)?;
    write_recalc_table(output, &table, "output")?;
    Ok(table.summary)
}

fn csv_error(source_name: &str, err: csv::Error) -> Error {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::io(source_name, e),
            other => Error::malformed(source_name, format!("{:?}", other)),
        }
    } else {
        Error::malformed(source_name, err.to_string())
    }
}
