use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

use super::events::RawLine;

/// Raw lines received by a consumer, kept for lookup and export
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Vec<RawLine>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: RawLine) {
        self.lines.push(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[RawLine] {
        &self.lines
    }

    /// Index of the first line logged at or after `wall_timestamp`.
    ///
    /// Timestamps share one fixed-width ISO format, so string order is time
    /// order. Used to jump from a snapshot to the lines around it.
    pub fn find_by_timestamp(&self, wall_timestamp: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.timestamp.as_str() >= wall_timestamp)
    }

    /// Write every line as `<timestamp> -> <text>`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        for line in &self.lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}
