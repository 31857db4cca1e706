//! Export sinks for harvested activities.
//!
//! The harvester hands every [`ActivityRecord`] to an [`ActivitySink`] in
//! the order it was fetched. [`CsvSink`] writes them as rows of a CSV file
//! with a fixed header; [`MemorySink`] keeps them in a `Vec` so the
//! harvest can be inspected directly.
//!
//! Sinks never reorder or deduplicate. [`ActivitySink::finish`] consumes
//! the sink, so it runs at most once.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::models::{ActivityRecord, CharacterId};

/// Destination for harvested rows.
pub trait ActivitySink {
    /// Append one record.
    fn write(&mut self, character_id: &str, record: &ActivityRecord) -> io::Result<()>;

    /// Flush and close the sink.
    fn finish(self) -> io::Result<()>
    where
        Self: Sized;
}

/// CSV writer with the `instanceId,mode,date,durationSeconds,pgcrLink` header.
pub struct CsvSink<W: Write> {
    out: W,
    rows: u64,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        CsvSink::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap `out` and write the header row.
    pub fn new(mut out: W) -> io::Result<Self> {
        write_row(&mut out, &ActivityRecord::HEADER)?;
        Ok(Self { out, rows: 0 })
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> ActivitySink for CsvSink<W> {
    fn write(&mut self, _character_id: &str, record: &ActivityRecord) -> io::Result<()> {
        write_row(&mut self.out, &record.fields())?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        self.into_inner().map(drop)
    }
}

fn write_row<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{}", line)
}

/// Quote a field if it contains a separator, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Collects rows in memory, tagged with the character they belong to.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<(CharacterId, ActivityRecord)>,
}

impl ActivitySink for MemorySink {
    fn write(&mut self, character_id: &str, record: &ActivityRecord) -> io::Result<()> {
        self.rows.push((character_id.to_string(), record.clone()));
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> ActivityRecord {
        ActivityRecord::new(
            id.to_string(),
            84,
            Utc.with_ymd_and_hms(2024, 6, 4, 17, 0, 0).unwrap(),
            903.0,
            "https://www.bungie.net/en/PGCR/",
        )
    }

    #[test]
    fn header_only_when_empty() {
        let sink = CsvSink::new(Vec::new()).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out, "instanceId,mode,date,durationSeconds,pgcrLink\n");
    }

    #[test]
    fn rows_in_write_order() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.write("c1", &record("200")).unwrap();
        sink.write("c1", &record("100")).unwrap();
        sink.write("c2", &record("200")).unwrap();
        assert_eq!(sink.rows(), 3);

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            "200,84,2024-06-04T17:00:00Z,903,https://www.bungie.net/en/PGCR/200"
        );
        assert!(lines[2].starts_with("100,"));
        assert!(lines[3].starts_with("200,"));
    }

    #[test]
    fn escapes_special_fields() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn create_makes_parent_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/activities.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.write("c1", &record("1")).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
