use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sequence::Guide;

/// Open a text input, decompressing transparently when the name ends in `.gz`.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader: Box<dyn BufRead> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Buffered output to `path`, or to stdout when no path is given.
pub fn open_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| Error::io(path, e))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };
    Ok(writer)
}

/// One guide per line. Blank lines and `#` comments are skipped, surrounding
/// whitespace is trimmed, every remaining line must be a valid guide.
pub fn read_guides<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<Guide>> {
    let mut guides = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(source_name, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let guide = Guide::new(trimmed).map_err(|e| match e {
            Error::InvalidInput(msg) => {
                Error::invalid_input(format!("{} line {}: {}", source_name, idx + 1, msg))
            }
            other => other,
        })?;
        guides.push(guide);
    }
    debug!("Read {} guide(s) from {}", guides.len(), source_name);
    Ok(guides)
}

pub fn read_guides_from_file(path: &Path) -> Result<Vec<Guide>> {
    let reader = open_reader(path)?;
    read_guides(reader, &path.display().to_string())
}
