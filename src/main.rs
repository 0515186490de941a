use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crisprtune::files::{open_reader, open_writer, read_guides_from_file};
use crisprtune::pipeline::{design_guides, rescore_table, write_mismatch_table, write_recalc_table};
use crisprtune::{desired_scores, Error, Result, WeightTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warning => "warn",
            // tracing has no level above ERROR
            Verbosity::Error | Verbosity::Critical => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-mismatch CRISPRi guide variants with tunable knockdown")]
struct Args {
    /// Logging verbosity (default: RUST_LOG, else info)
    #[arg(long, value_enum, global = true)]
    verbosity: Option<Verbosity>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Pick variants whose predicted efficacies span min..=max
    Mismatches {
        /// File with guide sequences, one per line (.gz accepted)
        #[arg(short, long = "guides-file", visible_alias = "spacers-file")]
        guides_file: PathBuf,

        /// Model weights, CSV with `feature` and `weight` columns
        #[arg(short, long = "parameters-file")]
        parameters_file: PathBuf,

        /// Lowest desired efficacy
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        min: f64,

        /// Highest desired efficacy
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        max: f64,

        /// Step between desired efficacies
        #[arg(long, default_value = "0.1")]
        step: f64,

        /// Print an empty line after each guide's rows
        #[arg(long)]
        separate_guides: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of threads to use (default: number of logical CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,
    },

    /// Re-score the original/variant pairs of an existing table
    Recalculate {
        /// Tab-separated table with `original` and `variant` columns
        #[arg(short, long = "existing-mismatches")]
        existing_mismatches: PathBuf,

        /// Model weights, CSV with `feature` and `weight` columns
        #[arg(short, long = "parameters-file")]
        parameters_file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn env_filter(verbosity: Option<Verbosity>) -> EnvFilter {
    match verbosity {
        Some(v) => EnvFilter::new(v.directive()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn run(args: Args) -> Result<()> {
    match args.mode {
        Mode::Mismatches {
            guides_file,
            parameters_file,
            min,
            max,
            step,
            separate_guides,
            output,
            threads,
        } => {
            let targets = desired_scores(min, max, step)?;
            info!("Reading parameters from {}", parameters_file.display());
            let weights = WeightTable::from_path(&parameters_file)?;

            let guides = read_guides_from_file(&guides_file)?;
            if guides.is_empty() {
                warn!("No guides in {}, writing header only", guides_file.display());
            }
            info!(
                "Loaded {} guide(s), {} target score(s) from {} to {}",
                guides.len(),
                targets.len(),
                min,
                max
            );

            let designs = match threads {
                Some(n) => rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()?
                    .install(|| design_guides(&guides, &weights, &targets))?,
                None => design_guides(&guides, &weights, &targets)?,
            };

            let dest = output
                .as_ref()
                .map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
            let mut out = open_writer(output.as_deref())?;
            write_mismatch_table(&mut out, &designs, separate_guides)
                .map_err(|e| Error::io(&dest, e))?;
            info!(
                "Wrote {} row(s) to {}",
                designs.iter().map(|d| d.rows.len()).sum::<usize>(),
                dest
            );
        }
        Mode::Recalculate {
            existing_mismatches,
            parameters_file,
            output,
        } => {
            info!("Reading parameters from {}", parameters_file.display());
            let weights = WeightTable::from_path(&parameters_file)?;

            let input = open_reader(&existing_mismatches)?;
            let table = rescore_table(
                input,
                &weights,
                &existing_mismatches.display().to_string(),
            )?;

            // Only opened once every row has scored
            let dest = output
                .as_ref()
                .map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
            let out = open_writer(output.as_deref())?;
            write_recalc_table(out, &table, &dest)?;
            let summary = table.summary;
            info!("Recalculated {} row(s) into column {}", summary.rows, summary.column);
            if let Some(changed) = summary.changed {
                if changed > 0 {
                    warn!("{} row(s) differ from the recorded y_pred", changed);
                } else {
                    info!("All rows match the recorded y_pred");
                }
            }
        }
    }
    info!("Done.");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(args.verbosity))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::with_default(subscriber, || match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_mismatches_defaults() {
        let args = Args::try_parse_from([
            "crisprtune",
            "mismatches",
            "--spacers-file",
            "guides.txt",
            "--parameters-file",
            "params.csv",
        ])
        .unwrap();
        assert_eq!(args.verbosity, None);
        match args.mode {
            Mode::Mismatches {
                min,
                max,
                step,
                separate_guides,
                output,
                threads,
                ..
            } => {
                assert_eq!((min, max, step), (0.0, 1.0, 0.1));
                assert!(!separate_guides);
                assert!(output.is_none());
                assert!(threads.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verbosity_and_negative_min() {
        let args = Args::try_parse_from([
            "crisprtune",
            "mismatches",
            "-g",
            "guides.txt",
            "-p",
            "params.csv",
            "--min",
            "-0.5",
            "--verbosity",
            "critical",
        ])
        .unwrap();
        assert_eq!(args.verbosity, Some(Verbosity::Critical));
        assert_eq!(Verbosity::Critical.directive(), "error");
        assert_eq!(Verbosity::Warning.directive(), "warn");
        match args.mode {
            Mode::Mismatches { min, .. } => assert_eq!(min, -0.5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_recalculate_requires_input() {
        assert!(Args::try_parse_from(["crisprtune", "recalculate", "-p", "params.csv"]).is_err());
        let args = Args::try_parse_from([
            "crisprtune",
            "recalculate",
            "--existing-mismatches",
            "old.tsv",
            "--parameters-file",
            "params.csv",
        ])
        .unwrap();
        assert!(matches!(args.mode, Mode::Recalculate { .. }));
    }

    const EXAMPLE_WEIGHTS: &str = "feature,weight\nintercept,0\n0,0.1\n1,0.2\n\
        AC,0.5\nAG,0.3\nAT,0.4\nCA,0\nCG,0\nCT,0\nGA,0.6\nGC,0.7\nGT,0.8\n\
        TA,0\nTC,0\nTG,0\nGC_content,0.05\n";

    #[test]
    fn test_empty_guide_file_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params.csv");
        let guides = dir.path().join("guides.txt");
        let output = dir.path().join("out.tsv");
        std::fs::write(&params, EXAMPLE_WEIGHTS).unwrap();
        std::fs::write(&guides, "\n  \n\n").unwrap();

        let args = Args::try_parse_from([
            "crisprtune",
            "mismatches",
            "-g",
            guides.to_str().unwrap(),
            "-p",
            params.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        run(args).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "original\tvariant\tchange_description\ty_pred\n"
        );
    }

    #[test]
    fn test_failed_recalculate_leaves_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params.csv");
        let existing = dir.path().join("old.tsv");
        let output = dir.path().join("new.tsv");
        std::fs::write(&params, EXAMPLE_WEIGHTS).unwrap();
        std::fs::write(&existing, "original\tvariant\nAG\tGG\nAG\tGGA\n").unwrap();

        let args = Args::try_parse_from([
            "crisprtune",
            "recalculate",
            "-e",
            existing.to_str().unwrap(),
            "-p",
            params.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(run(args), Err(Error::InvalidInput(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_unknown_verbosity_rejected() {
        assert!(Args::try_parse_from([
            "crisprtune",
            "recalculate",
            "-e",
            "old.tsv",
            "-p",
            "params.csv",
            "--verbosity",
            "loud",
        ])
        .is_err());
    }
}
