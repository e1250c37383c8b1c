//! # Signature Ingest
//!
//! Streams signature files into the store and the vp-tree. The input is
//! line-oriented text, one record per line:
//!
//! ```text
//! <decimal-id> <hex-signature>
//! ```
//!
//! Malformed lines are logged and skipped rather than failing the load;
//! the store behind this layer only ever sees well-formed records. A
//! [`Shard`] filter distributes signatures across machines by
//! `sig % total == index`, so every machine can read the same file and
//! keep only its slice.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Log a progress line every this many input lines.
const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Errors raised while reading a signature file. Per-line parse failures
/// are not errors; they are skipped and counted in [`LoadSummary`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("shard index {index} out of range for {total} machines")]
    InvalidShard { index: u64, total: u64 },
}

/// Which slice of the signature space this machine keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shard {
    index: u64,
    total: u64,
}

impl Shard {
    /// A shard filter for machine `index` of `total`.
    pub fn new(index: u64, total: u64) -> Result<Self, IngestError> {
        if total == 0 || index >= total {
            return Err(IngestError::InvalidShard { index, total });
        }
        Ok(Self { index, total })
    }

    /// The single-machine shard: accepts every signature.
    pub fn solo() -> Self {
        Self { index: 0, total: 1 }
    }

    /// Whether this machine keeps `sig`.
    #[inline]
    pub fn accepts(&self, sig: u64) -> bool {
        sig % self.total == self.index
    }

    /// True when the file is split across more than one machine.
    pub fn is_partial(&self) -> bool {
        self.total > 1
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Counters from one pass over a signature file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Lines read, well-formed or not.
    pub lines: u64,
    /// Records accepted by the shard filter and handed to the sink.
    pub accepted: u64,
    /// Malformed lines skipped.
    pub skipped: u64,
}

/// Counts newlines in `path` without parsing, for capacity estimation
/// ahead of the real load.
pub fn count_lines(path: &Path) -> Result<u64, IngestError> {
    let mut file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_owned(),
        source,
    })?;

    let mut buf = [0u8; 8192];
    let mut count = 0u64;
    loop {
        let n = file.read(&mut buf).map_err(|source| IngestError::Io {
            path: path.to_owned(),
            source,
        })?;
        if n == 0 {
            return Ok(count);
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
}

/// How many signatures this machine should expect from a file with
/// `total_lines` records: the per-machine share, plus 5% headroom when the
/// file is sharded (line counts stop predicting the modulo split exactly).
pub fn estimate(total_lines: u64, shard: &Shard) -> usize {
    let mut share = total_lines / shard.total();
    if shard.is_partial() {
        share += share / 20;
    }
    share as usize
}

/// Streams `path` through `sink` as `(docid, sig)` pairs, applying the
/// shard filter. Malformed lines are logged at `warn` with their line
/// number and skipped.
pub fn load<F>(path: &Path, shard: &Shard, mut sink: F) -> Result<LoadSummary, IngestError>
where
    F: FnMut(u64, u64),
{
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_owned(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = LoadSummary::default();
    for line in reader.lines() {
        let line = line.map_err(|source| IngestError::Io {
            path: path.to_owned(),
            source,
        })?;
        summary.lines += 1;

        match parse_line(&line) {
            Some((docid, sig)) => {
                if shard.accepts(sig) {
                    sink(docid, sig);
                    summary.accepted += 1;
                }
            }
            None => {
                tracing::warn!(line = summary.lines, "skipping malformed signature line");
                summary.skipped += 1;
            }
        }

        if summary.lines % PROGRESS_INTERVAL == 0 {
            tracing::info!(lines = summary.lines, accepted = summary.accepted, "loading");
        }
    }

    Ok(summary)
}

/// Parses `"<decimal-id> <hex-signature>"`. Extra whitespace between and
/// around the fields is tolerated; extra fields are not.
fn parse_line(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split_whitespace();
    let docid = fields.next()?.parse::<u64>().ok()?;
    let sig = u64::from_str_radix(fields.next()?, 16).ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((docid, sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn signature_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    fn collect(path: &Path, shard: &Shard) -> (Vec<(u64, u64)>, LoadSummary) {
        let mut records = Vec::new();
        let summary = load(path, shard, |docid, sig| records.push((docid, sig))).expect("load");
        (records, summary)
    }

    #[test]
    fn parses_id_and_hex_signature() {
        assert_eq!(parse_line("17 dead"), Some((17, 0xDEAD)));
        assert_eq!(
            parse_line("1 ffffffffffffffff"),
            Some((1, 0xFFFF_FFFF_FFFF_FFFF))
        );
        assert_eq!(parse_line("  3   0f  "), Some((3, 0x0F)));

        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("42"), None);
        assert_eq!(parse_line("notanid dead"), None);
        assert_eq!(parse_line("1 nothex"), None);
        assert_eq!(parse_line("1 dead extra"), None);
        // 17 hex digits overflow a u64
        assert_eq!(parse_line("1 10000000000000000"), None);
    }

    #[test]
    fn loads_well_formed_file() {
        let file = signature_file("1 aa\n2 ab\n3 ff00ff00ff00ff00\n");
        let (records, summary) = collect(file.path(), &Shard::solo());
        assert_eq!(
            records,
            vec![(1, 0xAA), (2, 0xAB), (3, 0xFF00_FF00_FF00_FF00)]
        );
        assert_eq!(
            summary,
            LoadSummary {
                lines: 3,
                accepted: 3,
                skipped: 0
            }
        );
    }

    #[test]
    fn skips_malformed_lines() {
        let file = signature_file("1 aa\nbogus\n2 zz\n3 bb\n");
        let (records, summary) = collect(file.path(), &Shard::solo());
        assert_eq!(records, vec![(1, 0xAA), (3, 0xBB)]);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.lines, 4);
    }

    #[test]
    fn shard_filters_by_signature_modulo() {
        let file = signature_file("1 10\n2 11\n3 12\n4 13\n");
        let shard = Shard::new(1, 2).expect("shard");
        let (records, summary) = collect(file.path(), &shard);
        // 0x11 and 0x13 are odd
        assert_eq!(records, vec![(2, 0x11), (4, 0x13)]);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.lines, 4);
    }

    #[test]
    fn shard_validation() {
        assert!(Shard::new(0, 1).is_ok());
        assert!(Shard::new(2, 3).is_ok());
        assert!(matches!(
            Shard::new(3, 3),
            Err(IngestError::InvalidShard { index: 3, total: 3 })
        ));
        assert!(matches!(
            Shard::new(0, 0),
            Err(IngestError::InvalidShard { .. })
        ));
        assert!(Shard::solo().accepts(0));
        assert!(Shard::solo().accepts(u64::MAX));
    }

    #[test]
    fn counts_lines() {
        let file = signature_file("1 aa\n2 bb\n3 cc\n");
        assert_eq!(count_lines(file.path()).expect("count"), 3);

        let empty = signature_file("");
        assert_eq!(count_lines(empty.path()).expect("count"), 0);
    }

    #[test]
    fn estimates_capacity() {
        assert_eq!(estimate(1_000, &Shard::solo()), 1_000);
        // sharded estimates carry 5% headroom
        let shard = Shard::new(0, 4).expect("shard");
        assert_eq!(estimate(1_000, &shard), 262);
    }

    #[test]
    fn missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/signatures.txt");
        assert!(matches!(
            count_lines(missing),
            Err(IngestError::Io { .. })
        ));
        assert!(matches!(
            load(missing, &Shard::solo(), |_, _| {}),
            Err(IngestError::Io { .. })
        ));
    }
}
