//! Thin façade over message passing between ranks.
//!
//! Messages are contiguous byte slices keyed by `(source, destination, tag)`
//! and delivered in FIFO order per key. Every transfer is two-phase: `isend`
//! or `irecv` initiates it and returns a handle, and nothing may be assumed
//! about the buffer until the handle has been waited. Callers initiate the
//! whole batch of one logical exchange before waiting on any of it.
//!
//! Backends:
//! - [`LocalComm`]: every rank is a thread in this process, sharing a mailbox.
//! - `MpiComm` (feature `mpi-support`): one rank per MPI process.

pub mod local;
#[cfg(feature = "mpi-support")]
pub mod mpi;
pub mod wire;

pub use local::{LocalComm, LocalUniverse};
#[cfg(feature = "mpi-support")]
pub use self::mpi::MpiComm;

use std::fmt;

use thiserror::Error;

use crate::topology::Direction;

/// Transport-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    /// The process group was aborted while this operation was pending.
    #[error("process group aborted")]
    Aborted,
    /// Peer rank outside the group.
    #[error("rank {rank} outside process group of size {size}")]
    InvalidRank { rank: usize, size: usize },
    /// A message arrived with a different size than the posted receive.
    #[error("message from rank {peer} with tag {tag} is {actual} bytes, expected {expected}")]
    LengthMismatch {
        peer: usize,
        tag: CommTag,
        expected: usize,
        actual: usize,
    },
    /// Error reported by the underlying transport.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Which metadata or payload field of a tile a scatter message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileField {
    Width,
    Height,
    Padding,
    Data,
}

/// Message tag. Each logical message stream gets its own code so sender and
/// receiver derive it from the same name instead of from rank arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Single tag for gathered tiles.
    pub const GATHER: CommTag = CommTag(0x2000);

    /// Scatter tag for one field of a tile.
    pub const fn scatter(field: TileField) -> CommTag {
        CommTag(
            0x1000
                + match field {
                    TileField::Width => 0,
                    TileField::Height => 1,
                    TileField::Padding => 2,
                    TileField::Data => 3,
                },
        )
    }

    /// Halo tag for data travelling in direction `travel`.
    ///
    /// A send towards the north neighbour and a receive from the south
    /// neighbour both move data northward, so they share a tag.
    pub const fn halo(travel: Direction) -> CommTag {
        CommTag(
            0x3000
                + match travel {
                    Direction::North => 0,
                    Direction::South => 1,
                    Direction::East => 2,
                    Direction::West => 3,
                },
        )
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CommTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Block until completion; receives yield their payload.
    fn wait(self) -> Result<Option<Vec<u8>>, CommError>;
}

impl Wait for () {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        Ok(None)
    }
}

/// Non-blocking point-to-point interface plus the two collectives the
/// simulation needs.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Initiate a send of `buf` to `peer`. The buffer is copied; the caller
    /// may reuse it immediately.
    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<Self::SendHandle, CommError>;

    /// Initiate a receive of exactly `len` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Result<Self::RecvHandle, CommError>;

    /// Wait for a batch of sends and receives together.
    ///
    /// Every handle is drained even after a failure; the first error wins.
    /// On success the payloads come back in the order of `recvs`.
    fn wait_all(
        &self,
        sends: Vec<Self::SendHandle>,
        recvs: Vec<Self::RecvHandle>,
    ) -> Result<Vec<Vec<u8>>, CommError> {
        let mut first_err = None;
        let mut payloads = Vec::with_capacity(recvs.len());
        for h in recvs {
            match h.wait() {
                Ok(data) => payloads.push(data.unwrap_or_default()),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        for h in sends {
            if let Err(e) = h.wait() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(payloads),
        }
    }

    /// Collective barrier over the whole group.
    fn barrier(&self) -> Result<(), CommError>;

    /// Tear down the whole group; pending and future operations on every
    /// rank fail with [`CommError::Aborted`].
    fn abort(&self);
}
