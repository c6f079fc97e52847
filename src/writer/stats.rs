//! Cumulative counters reported by a finished writer.

use std::fmt;

/// Totals accumulated over a writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Rows written across all row groups.
    pub rows_written: u64,
    /// Row groups committed to the file.
    pub row_groups_written: usize,
    /// Compressed bytes in the finished file, as reported by the footer.
    pub bytes_written: u64,
}

impl fmt::Display for WriterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows in {} row groups ({} bytes)",
            self.rows_written, self.row_groups_written, self.bytes_written
        )
    }
}
