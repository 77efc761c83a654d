//! Persisting confirmed addresses

use crate::probe::models::{ProbeRecord, ValidationOutcome};
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Appends every VALID address to a file, one per line, flushing as it goes
/// so an interrupted run keeps what it found.
pub struct ValidSink<W: Write> {
    writer: W,
    written: usize,
}

impl ValidSink<File> {
    /// Open `path` for appending, creating it if needed
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ValidSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write the record's address if it is VALID; other outcomes are skipped
    pub fn record(&mut self, record: &ProbeRecord) -> Result<()> {
        if record.outcome != ValidationOutcome::Valid {
            return Ok(());
        }

        writeln!(self.writer, "{}", record.address)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::Route;

    fn record(address: &str, outcome: ValidationOutcome) -> ProbeRecord {
        ProbeRecord::new(address.to_string(), outcome, Route::Direct, 1)
    }

    #[test]
    fn test_only_valid_addresses_are_written() {
        let mut sink = ValidSink::new(Vec::new());
        sink.record(&record("a@tenant.com", ValidationOutcome::Valid)).unwrap();
        sink.record(&record("b@tenant.com", ValidationOutcome::Invalid)).unwrap();
        sink.record(&record("c@tenant.com", ValidationOutcome::Undetermined)).unwrap();
        sink.record(&record("d@tenant.com", ValidationOutcome::Valid)).unwrap();

        assert_eq!(sink.written(), 2);
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "a@tenant.com\nd@tenant.com\n");
    }

    #[test]
    fn test_append_keeps_existing_lines() {
        let path = std::env::temp_dir()
            .join(format!("tenant-probe-sink-{}.txt", std::process::id()));
        std::fs::write(&path, "old@tenant.com\n").unwrap();

        {
            let mut sink = ValidSink::append(&path).unwrap();
            sink.record(&record("new@tenant.com", ValidationOutcome::Valid)).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(content, "old@tenant.com\nnew@tenant.com\n");
    }
}
