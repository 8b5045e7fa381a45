//! The record source file parser and the result serializer: newline-delimited
//! JSON in, newline-delimited JSON out.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use graph_error::{ErrorKind, GraphError, Result, ResultExt};

use crate::execution::RecordStream;
use crate::record::Record;

/// Lazily parses one JSON object per line from a file, opening the file on
/// first pull and never reading more of it than the consumer asks for.
pub struct FileRecordStream {
    path: String,
    reader: BufReader<File>,
    line_no: usize,
}

impl FileRecordStream {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("opening {}", path.display()))?;
        Ok(FileRecordStream {
            path: path.display().to_string(),
            reader: BufReader::new(file),
            line_no: 0,
        })
    }
}

impl RecordStream for FileRecordStream {
    fn next(&mut self) -> Result<Option<Record>> {
        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(trimmed).map_err(|e| {
                GraphError::with_source(
                    ErrorKind::SourceParse,
                    format!("{}:{}: invalid record", self.path, self.line_no),
                    Box::new(e),
                )
            })?;
            return Ok(Some(record));
        }
    }
}

/// Writes `records` to `path` as newline-delimited JSON, one record per line.
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    let file = File::create(path).context(format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
