//! Reading captured logs line by line.
//!
//! Device logs routinely carry bytes that are not valid UTF-8. Such lines
//! are decoded lossily instead of failing the whole read; only I/O errors
//! are reported.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Iterator over the lines of a reader, with `\n` or `\r\n` stripped.
pub struct LogLines<R> {
    reader: R,
    buf: Vec<u8>,
    lossy: usize,
}

impl<R: BufRead> LogLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            lossy: 0,
        }
    }

    /// Lines so far that needed replacement characters.
    pub fn lossy(&self) -> usize {
        self.lossy
    }
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let line = match String::from_utf8(std::mem::take(&mut self.buf)) {
                    Ok(line) => line,
                    Err(err) => {
                        self.lossy += 1;
                        let line = String::from_utf8_lossy(err.as_bytes()).into_owned();
                        tracing::warn!("Invalid UTF-8 in log line: {line}");
                        line
                    }
                };
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Open `path` for line-wise reading.
pub fn open_log(path: &Path) -> io::Result<LogLines<BufReader<File>>> {
    Ok(LogLines::new(BufReader::new(File::open(path)?)))
}

/// Every line of the log at `path`.
pub fn read_log_lines(path: &Path) -> io::Result<Vec<String>> {
    open_log(path)?.collect()
}
