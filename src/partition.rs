//! Partition filters for scans and queries.
//!
//! A filter restricts a scan or query to a contiguous range of partitions,
//! optionally resuming after a given record digest.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of partitions in a namespace
pub const PARTITION_COUNT: u32 = 4096;

/// Size of a record key digest in bytes
pub const DIGEST_SIZE: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Invalid partition id: {part_id} (max: {max})")]
    InvalidPartitionId { part_id: u32, max: u32 },

    #[error("Invalid partition range: begin {begin}, count {count}")]
    InvalidRange { begin: u32, count: u32 },
}

pub type PartitionResult<T> = Result<T, PartitionError>;

/// Hash of a record's key, which also determines its partition
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; DIGEST_SIZE]);

impl Digest {
    /// Partition that owns records with this digest
    pub fn partition_id(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]]) & (PARTITION_COUNT as u16 - 1)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Range of partitions a scan or query visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFilter {
    begin: u16,
    count: u16,
    digest: Option<Digest>,
}

impl PartitionFilter {
    /// Every partition
    pub fn all() -> Self {
        Self {
            begin: 0,
            count: PARTITION_COUNT as u16,
            digest: None,
        }
    }

    /// A single partition
    pub fn by_id(part_id: u32) -> PartitionResult<Self> {
        if part_id >= PARTITION_COUNT {
            return Err(PartitionError::InvalidPartitionId {
                part_id,
                max: PARTITION_COUNT - 1,
            });
        }
        Ok(Self {
            begin: part_id as u16,
            count: 1,
            digest: None,
        })
    }

    /// Records after `digest` within the partition containing it.
    ///
    /// Digest order is not the same as user key order. The C client's
    /// `as_partition_filter_set_after` leaves `begin` at 0; here `begin` is the
    /// digest's own partition so that [`contains`](Self::contains) agrees with
    /// the digest.
    pub fn after(digest: Digest) -> Self {
        Self {
            begin: digest.partition_id(),
            count: 1,
            digest: Some(digest),
        }
    }

    /// `count` partitions starting at `begin`
    pub fn by_range(begin: u32, count: u32) -> PartitionResult<Self> {
        let end = begin.checked_add(count);
        if count == 0 || end.map_or(true, |end| end > PARTITION_COUNT) {
            return Err(PartitionError::InvalidRange { begin, count });
        }
        Ok(Self {
            begin: begin as u16,
            count: count as u16,
            digest: None,
        })
    }

    pub fn begin(&self) -> u16 {
        self.begin
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn contains(&self, part_id: u16) -> bool {
        part_id >= self.begin && u32::from(part_id) < u32::from(self.begin) + u32::from(self.count)
    }
}

impl Default for PartitionFilter {
    fn default() -> Self {
        Self::all()
    }
}
