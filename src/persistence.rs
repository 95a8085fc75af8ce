//! CSV append-only durable log for the normalized stream.
//!
//! One `OutputSink` implementation, kept minimal because persistence is an
//! external collaborator: the core's only obligation is to call
//! `append(Tick)` for every emitted tick.

use crate::codec::Tick;
use crate::normalizer::OutputSink;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

const CSV_HEADER: &str = "timestamp_ms,feed_id,seq_id,price,size,flags\n";

/// Appends each normalized tick as one CSV row, price formatted to 6
/// decimal places. A single mutex guards the writer, matching the
/// original implementation's one-`FILE*`-per-log design.
#[derive(Debug)]
pub struct CsvPersistence {
  writer: Mutex<BufWriter<File>>,
}

impl CsvPersistence {
  /// Open (creating if needed) `path` for append, writing the header row
  /// only if the file is new/empty.
  pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
    let path = path.as_ref();
    let needs_header = !path.exists() || std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    if needs_header {
      writer.write_all(CSV_HEADER.as_bytes())?;
      writer.flush()?;
    }
    Ok(CsvPersistence { writer: Mutex::new(writer) })
  }

  /// Append one row for `tick`, flushing immediately.
  pub fn append(&self, tick: Tick) -> std::io::Result<()> {
    let mut writer = self.writer.lock().expect("persistence writer mutex poisoned");
    writeln!(
      writer,
      "{},{},{},{:.6},{},{}",
      tick.timestamp_ms, tick.feed_id, tick.seq_id, tick.price, tick.size, tick.flags
    )?;
    writer.flush()
  }
}

impl OutputSink for CsvPersistence {
  fn emit(&self, tick: Tick) {
    if let Err(e) = self.append(tick) {
      log::error!("persistence: failed to append tick: {e}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_header_once_and_formats_price() {
    let dir = std::env::temp_dir().join(format!("tick-relay-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("ticks.csv");
    let _ = std::fs::remove_file(&path);

    let sink = CsvPersistence::open(&path).unwrap();
    sink
      .append(Tick { timestamp_ms: 1, feed_id: 2, seq_id: 3, price: 10.5, size: 4, flags: 0 })
      .unwrap();
    drop(sink);

    // Reopening an existing non-empty file must not duplicate the header.
    let sink2 = CsvPersistence::open(&path).unwrap();
    sink2
      .append(Tick { timestamp_ms: 5, feed_id: 6, seq_id: 7, price: 1.0, size: 8, flags: 1 })
      .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "timestamp_ms,feed_id,seq_id,price,size,flags");
    assert_eq!(lines[1], "1,2,3,10.500000,4,0");
    assert_eq!(lines[2], "5,6,7,1.000000,8,1");
    assert_eq!(lines.len(), 3);

    std::fs::remove_file(&path).ok();
  }
}
