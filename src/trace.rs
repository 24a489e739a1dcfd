//! Access-trace input.
//!
//! Two line formats are accepted, one access per line:
//!
//! ```text
//!   op,key                                                  simple
//!   timestamp,key,key_size,value_size,client_id,op,ttl      Twitter cache trace
//! ```
//!
//! `get` and `gets` are reads, `delete` only drops the key from the exact
//! statistics, and every other operation (`set`, `add`, `cas`, `incr`, ...)
//! is a write. Blank lines and lines starting with `#` are skipped.
use std::fmt;
use std::io::BufRead;

use crate::report::KeyStats;
use crate::sync::{FanOutReport, SeparatorSet};

/// Keys are opaque byte strings.
pub type Key = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOp {
    Get(Key),
    Put(Key),
    Delete(Key),
}

impl TraceOp {
    pub fn key(&self) -> &Key {
        match self {
            TraceOp::Get(key) | TraceOp::Put(key) | TraceOp::Delete(key) => key,
        }
    }

    fn from_fields(op: &[u8], key: &[u8]) -> Option<Self> {
        let key = key.trim_ascii();
        if key.is_empty() {
            return None;
        }
        let key = key.to_vec();
        let op = op.trim_ascii();
        Some(if op.eq_ignore_ascii_case(b"get") || op.eq_ignore_ascii_case(b"gets") {
            TraceOp::Get(key)
        } else if op.eq_ignore_ascii_case(b"delete") {
            TraceOp::Delete(key)
        } else {
            TraceOp::Put(key)
        })
    }
}

/// A trace line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceError {
    line: usize,
    reason: String,
}

impl TraceError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for TraceError {}

/// Parses one line. `Ok(None)` for blank and comment lines. Keys are
/// taken verbatim and need not be UTF-8.
pub fn parse_line(line: &[u8]) -> Result<Option<TraceOp>, String> {
    let line = line.trim_ascii();
    if line.is_empty() || line.starts_with(b"#") {
        return Ok(None);
    }
    let fields: Vec<&[u8]> = line.split(|&byte| byte == b',').collect();
    let (op, key) = match fields.len() {
        2 => (fields[0], fields[1]),
        7 => (fields[5], fields[1]),
        n => return Err(format!("expected 2 or 7 comma-separated fields, got {n}")),
    };
    TraceOp::from_fields(op, key)
        .map(Some)
        .ok_or_else(|| "empty key".to_string())
}

/// Streams operations from a buffered reader, one `\n`-terminated line at a
/// time. A line that fails to read still counts toward line numbers.
#[derive(Debug)]
pub struct TraceReader<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceOp, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf);
            if matches!(read, Ok(0)) {
                return None;
            }
            self.line += 1;
            if let Err(e) = read {
                return Some(Err(TraceError::new(self.line, e.to_string())));
            }
            match parse_line(&self.buf) {
                Ok(Some(op)) => return Some(Ok(op)),
                Ok(None) => continue,
                Err(reason) => return Some(Err(TraceError::new(self.line, reason))),
            }
        }
    }
}

/// Routes one operation to every separator. Deletes are not forwarded.
pub fn feed(op: &TraceOp, set: &SeparatorSet<Key>) -> FanOutReport {
    match op {
        TraceOp::Get(key) => set.get(key),
        TraceOp::Put(key) => set.put(key),
        TraceOp::Delete(_) => FanOutReport::default(),
    }
}

/// Records one operation in the exact statistics.
pub fn record(op: &TraceOp, stats: &mut KeyStats<Key>) {
    match op {
        TraceOp::Get(key) | TraceOp::Put(key) => stats.record(key),
        TraceOp::Delete(key) => {
            stats.remove(key);
        }
    }
}

/// [`record`] followed by [`feed`].
pub fn apply(op: &TraceOp, set: &SeparatorSet<Key>, stats: &mut KeyStats<Key>) -> FanOutReport {
    record(op, stats);
    feed(op, set)
}
