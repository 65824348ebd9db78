use crate::models::DocumentRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes the tab-delimited snapshot file.
///
/// The first line is a `#` header naming the exported fields; every record
/// after that is one tab-joined line in the same field order. Output is
/// append-only during a run, so a partial snapshot left behind by an aborted
/// crawl is still well-formed.
pub struct SnapshotWriter<W: Write> {
    writer: W,
    record_count: u64,
}

impl SnapshotWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, fields: &[String]) -> io::Result<Self> {
        let file = File::create(path)?;
        SnapshotWriter::new(BufWriter::new(file), fields)
    }
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(mut writer: W, fields: &[String]) -> io::Result<Self> {
        writeln!(writer, "# {}", fields.join("\t"))?;
        Ok(Self {
            writer,
            record_count: 0,
        })
    }

    pub fn write_record(&mut self, record: &DocumentRecord) -> io::Result<()> {
        let mut first = true;
        for value in record.values() {
            if !first {
                self.writer.write_all(b"\t")?;
            }
            write!(self.writer, "{}", value)?;
            first = false;
        }
        self.writer.write_all(b"\n")?;
        self.record_count += 1;
        Ok(())
    }

    /// Push buffered lines to the sink so records written so far survive a
    /// later abort.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Flush and hand back the underlying sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
