//! Ordered container for one postfix predicate program.

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};

use crate::predexp::error::{PredExpError, PredExpResult, ValidationError};
use crate::predexp::limits::Limits;
use crate::predexp::node::PredExp;
use crate::predexp::validator::Validator;

/// Result of the size pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSize {
    /// Bytes the encoder will write
    pub total_bytes: u32,
    /// Number of nodes in the program
    pub node_count: u32,
}

/// An append-only program of owned nodes.
///
/// Append order is evaluation order. The list must not be modified while a size
/// or write pass over it is running; callers that share it across threads
/// provide that exclusion themselves.
#[derive(Debug, Default)]
pub struct PredExpList {
    nodes: Vec<PredExp>,
    limits: Limits,
}

impl PredExpList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, Limits::default())
    }

    pub fn with_limits(capacity: usize, limits: Limits) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Take ownership of `node` and append it to the program.
    pub fn add(&mut self, node: PredExp) -> PredExpResult<()> {
        self.nodes.try_reserve(1)?;
        trace!("predexp add #{}: {}", self.nodes.len(), node);
        self.nodes.push(node);
        Ok(())
    }

    /// Append a node and return the list, for chained construction.
    pub fn with(mut self, node: PredExp) -> PredExpResult<Self> {
        self.add(node)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredExp> {
        self.nodes.iter()
    }

    /// Size pass: total encoded bytes and node count.
    ///
    /// Fails with [`PredExpError::SizeOverflow`] when the program exceeds the
    /// list's budget.
    pub fn size(&self) -> PredExpResult<ProgramSize> {
        let total: u64 = self
            .nodes
            .iter()
            .map(|node| node.encoded_size() as u64)
            .sum();

        let max = self.limits.max_program_size;
        if total > u64::from(max) {
            return Err(PredExpError::SizeOverflow { size: total, max });
        }
        let node_count = u32::try_from(self.nodes.len()).map_err(|_| {
            PredExpError::SizeOverflow {
                size: total,
                max,
            }
        })?;

        let size = ProgramSize {
            // Bounded by max above
            total_bytes: total as u32,
            node_count,
        };
        debug!(
            "predexp size: {} nodes, {} bytes",
            size.node_count, size.total_bytes
        );
        Ok(size)
    }

    /// Encode every node, in append order, into `buf`.
    ///
    /// Returns the number of bytes written, which always equals
    /// [`ProgramSize::total_bytes`]. Nothing is written when the program is over
    /// budget or `buf` lacks room.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> PredExpResult<usize> {
        let size = self.size()?;
        let required = size.total_bytes as usize;
        if buf.remaining_mut() < required {
            return Err(PredExpError::BufferTooSmall {
                required,
                available: buf.remaining_mut(),
            });
        }

        let mut written = 0;
        for node in &self.nodes {
            written += node.write(buf);
        }
        debug_assert_eq!(written, required);
        debug!("predexp write: {} bytes", written);
        Ok(written)
    }

    /// Encode into a freshly allocated buffer of exactly the program size.
    pub fn encode(&self) -> PredExpResult<Bytes> {
        let size = self.size()?;
        let mut buf = BytesMut::with_capacity(size.total_bytes as usize);
        self.write(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Check the program's stack discipline, operand types and variable scopes.
    ///
    /// Validation is opt-in and never changes the encoded bytes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Validator::new().check(&self.nodes)
    }

    /// Release every node and the list storage, returning how many nodes were released.
    pub fn destroy(self) -> usize {
        let count = self.nodes.len();
        debug!("predexp destroy: {} nodes", count);
        count
    }
}

impl<'a> IntoIterator for &'a PredExpList {
    type Item = &'a PredExp;
    type IntoIter = std::slice::Iter<'a, PredExp>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl FromIterator<PredExp> for PredExpList {
    fn from_iter<I: IntoIterator<Item = PredExp>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
            limits: Limits::default(),
        }
    }
}
