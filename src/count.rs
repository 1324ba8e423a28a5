//! Record counting for manifest and removal-list files.
//!
//! Every file this crate reads is treated as newline-delimited records; the
//! column layout of FAM/BIM files is irrelevant here.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CountError {
    #[error("input file {} could not be opened: {source}", path.display())]
    MissingInputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed while reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Counts newline-delimited records in `path`.
///
/// A trailing record without a final newline still counts, so `"a\nb"` and
/// `"a\nb\n"` both yield 2. Content is never decoded. Only `\n` ends a
/// record: `\r\n` counts once, and a lone `\r` (classic Mac line endings)
/// does not end one, so `"a\rb\r"` yields 1.
pub fn count_lines<P: AsRef<Path>>(path: P) -> Result<u64, CountError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CountError::MissingInputFile {
        path: path.to_path_buf(),
        source,
    })?;

    let count = count_records(BufReader::new(file)).map_err(|source| CountError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), records = count, "counted records");
    Ok(count)
}

/// Counts records from any buffered reader.
pub fn count_records<R: BufRead>(mut reader: R) -> io::Result<u64> {
    let mut count = 0u64;
    let mut last = None;

    loop {
        let consumed = {
            let buf = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                break;
            }
            count += buf.iter().filter(|&&b| b == b'\n').count() as u64;
            last = buf.last().copied();
            buf.len()
        };
        reader.consume(consumed);
    }

    // Unterminated final record
    if matches!(last, Some(b) if b != b'\n') {
        count += 1;
    }
    Ok(count)
}

/// Number of samples in a FAM-like manifest.
pub fn count_samples<P: AsRef<Path>>(fam: P) -> Result<u64, CountError> {
    count_lines(fam)
}

/// Number of variants in a BIM-like manifest.
pub fn count_variants<P: AsRef<Path>>(bim: P) -> Result<u64, CountError> {
    count_lines(bim)
}

/// Total records across a set of removal lists.
///
/// All files are counted line by line whatever their extension; a `.bed`
/// removal list is a region list here, not a PLINK genotype matrix.
pub fn count_variants_to_remove<I, P>(paths: I) -> Result<u64, CountError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut total = 0;
    for path in paths {
        total += count_lines(path)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn counts_terminated_and_unterminated_records() {
        assert_eq!(count_records(Cursor::new("a\nb\n")).unwrap(), 2);
        assert_eq!(count_records(Cursor::new("a\nb")).unwrap(), 2);
        assert_eq!(count_records(Cursor::new("")).unwrap(), 0);
    }

    #[test]
    fn only_line_feed_ends_a_record() {
        assert_eq!(count_records(Cursor::new("a\r\nb\r\n")).unwrap(), 2);
        assert_eq!(count_records(Cursor::new("a\rb\r")).unwrap(), 1);
    }

    #[test]
    fn blank_lines_are_records() {
        assert_eq!(count_records(Cursor::new("\n\n\n")).unwrap(), 3);
        assert_eq!(count_records(Cursor::new("a\n\nb\n")).unwrap(), 3);
    }

    #[test]
    fn invalid_utf8_is_counted_not_rejected() {
        let data: &[u8] = &[0xff, 0xfe, b'\n', 0xc3, b'\n'];
        assert_eq!(count_records(Cursor::new(data)).unwrap(), 2);
    }

    #[test]
    fn counts_across_small_buffers() {
        let data = "x\n".repeat(1000);
        let reader = BufReader::with_capacity(7, Cursor::new(data.into_bytes()));
        assert_eq!(count_records(reader).unwrap(), 1000);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.fam");
        match count_lines(&path).unwrap_err() {
            CountError::MissingInputFile { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn removal_lists_sum_including_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("indels.txt");
        let b = dir.path().join("strand.txt");
        let c = dir.path().join("unmapped.bed");
        std::fs::write(&a, "rs1\nrs2\n").unwrap();
        std::fs::write(&b, "").unwrap();
        std::fs::write(&c, "1\t100\t101\n").unwrap();

        let total = count_variants_to_remove([&a, &b, &c]).unwrap();
        let expected =
            count_lines(&a).unwrap() + count_lines(&b).unwrap() + count_lines(&c).unwrap();
        assert_eq!(total, 3);
        assert_eq!(total, expected);
    }
}
