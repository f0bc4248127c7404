//! Size-bounded batch partitioning.
//!
//! Records are grouped greedily in arrival order: a single left-to-right scan
//! keeps a running byte total and closes the current batch as soon as the next
//! record would push it past the limit. Batches are never reordered and a
//! record is never split, dropped, or truncated. A record that is larger than
//! the limit on its own is isolated in a one-element batch.

use std::ops::Range;
use std::str::FromStr;

use serde::Serialize;

use crate::{
    error::ConfigError,
    serialise::{PayloadCodec, SerializationError},
};


/// Default upper bound for one batch payload (256 KiB).
pub const DEFAULT_MAX_BATCH_BYTES: usize = 262_144;

/// How batch sizes are accounted against the limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeAccounting {
    /// Sum of the individually encoded record sizes.
    #[default]
    PerRecord,
    /// Record sizes plus the array framing of the encoded batch.
    Framed,
}

impl FromStr for SizeAccounting {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_record" | "per-record" => Ok(Self::PerRecord),
            "framed" => Ok(Self::Framed),
            other => Err(ConfigError::InvalidConfig(format!(
                "invalid size accounting '{other}'. Valid options are: per_record, framed"
            ))),
        }
    }
}

/// Contiguous run of records sent as one payload.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch<'a, T> {
    records: &'a [T],
    offset: usize,
    bytes: usize,
}

impl<T> Clone for Batch<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Batch<'_, T> {}

impl<'a, T> Batch<'a, T> {
    /// Records in this batch, in input order.
    pub fn records(&self) -> &'a [T] {
        self.records
    }

    /// Index of the first record within the input sequence.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bytes accounted for this batch.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Whether this is a lone record that exceeds `limit` by itself.
    pub fn is_oversized(&self, limit: usize) -> bool {
        self.records.len() == 1 && self.bytes > limit
    }
}

/// Split a sequence of record sizes into contiguous index ranges.
///
/// `overhead(n)` returns the extra bytes a batch of `n` records costs on top
/// of the record sizes; pass `|_| 0` for plain per-record accounting. The
/// result is deterministic and never empty unless `sizes` is.
pub fn partition_sizes(
    sizes: &[usize],
    limit: usize,
    overhead: impl Fn(usize) -> usize,
) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut total = 0usize;

    for (index, &size) in sizes.iter().enumerate() {
        let candidate = total.saturating_add(size);
        let count = index - start + 1;
        if index > start && candidate.saturating_add(overhead(count)) > limit {
            ranges.push(start..index);
            start = index;
            total = size;
        } else {
            total = candidate;
        }
    }

    if start < sizes.len() {
        ranges.push(start..sizes.len());
    }
    ranges
}

/// Groups serialisable records into batches bounded by a byte limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partitioner {
    codec: PayloadCodec,
    limit: usize,
    accounting: SizeAccounting,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new(
            PayloadCodec::default(),
            DEFAULT_MAX_BATCH_BYTES,
            SizeAccounting::default(),
        )
    }
}

impl Partitioner {
    pub fn new(codec: PayloadCodec, limit: usize, accounting: SizeAccounting) -> Self {
        Self {
            codec,
            limit,
            accounting,
        }
    }

    pub fn codec(&self) -> PayloadCodec {
        self.codec
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn accounting(&self) -> SizeAccounting {
        self.accounting
    }

    /// Measure every record and partition the sequence.
    ///
    /// Serialisation failures surface before any grouping takes place; the
    /// grouping itself cannot fail.
    pub fn partition<'a, T: Serialize>(
        &self,
        records: &'a [T],
    ) -> Result<Vec<Batch<'a, T>>, SerializationError> {
        let sizes = records
            .iter()
            .map(|record| self.codec.record_size(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.partition_measured(records, &sizes))
    }

    /// Partition records whose encoded sizes are already known.
    ///
    /// `sizes[i]` must be the encoded size of `records[i]`.
    fn partition_measured<'a, T>(&self, records: &'a [T], sizes: &[usize]) -> Vec<Batch<'a, T>> {
        debug_assert_eq!(records.len(), sizes.len());
        let overhead = |count: usize| self.overhead(count);
        partition_sizes(sizes, self.limit, overhead)
            .into_iter()
            .map(|range| Batch {
                records: &records[range.clone()],
                offset: range.start,
                bytes: sizes[range.clone()].iter().sum::<usize>() + self.overhead(range.len()),
            })
            .collect()
    }

    fn overhead(&self, count: usize) -> usize {
        match self.accounting {
            SizeAccounting::PerRecord => 0,
            SizeAccounting::Framed => self.codec.framing_overhead(count),
        }
    }
}
