//! MPI backend (feature `mpi-support`): one rank per MPI process.
//!
//! Non-blocking requests must outlive the call that created them, so each
//! request owns a heap buffer that is released to MPI for the lifetime of
//! the request and reclaimed in `wait`.

use mpi::Tag;
use mpi::environment::Universe;
use mpi::request::{Request, StaticScope};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::{CommError, CommTag, Communicator, Wait};

/// World communicator of an initialized MPI environment.
pub struct MpiComm {
    // Dropping the universe finalizes MPI.
    _universe: Universe,
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
}

impl MpiComm {
    /// Initialize MPI. Fails if MPI was already initialized.
    pub fn init() -> Result<Self, CommError> {
        let universe = mpi::initialize()
            .ok_or_else(|| CommError::Transport("MPI already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(Self {
            _universe: universe,
            world,
            rank,
            size,
        })
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer >= self.size {
            return Err(CommError::InvalidRank {
                rank: peer,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// Pending MPI send; owns the packed buffer until completion.
pub struct MpiSend {
    request: Request<'static, [u8], StaticScope>,
    buf: *mut [u8],
}

/// Pending MPI receive; owns the destination buffer until completion.
pub struct MpiRecv {
    request: Request<'static, [u8], StaticScope>,
    buf: *mut [u8],
}

impl Wait for MpiSend {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        self.request.wait();
        // SAFETY: the request has completed, MPI no longer references `buf`,
        // and `buf` came from `Box::into_raw` in `isend`.
        drop(unsafe { Box::from_raw(self.buf) });
        Ok(None)
    }
}

impl Wait for MpiRecv {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        self.request.wait();
        // SAFETY: as for `MpiSend`; the receive has filled the buffer.
        let data = unsafe { Box::from_raw(self.buf) };
        Ok(Some(data.into_vec()))
    }
}

impl Communicator for MpiComm {
    type SendHandle = MpiSend;
    type RecvHandle = MpiRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<MpiSend, CommError> {
        self.check_peer(peer)?;
        let raw = Box::into_raw(buf.to_vec().into_boxed_slice());
        // SAFETY: `raw` stays allocated until `MpiSend::wait` reclaims it.
        let data: &'static [u8] = unsafe { &*raw };
        let request = self
            .world
            .process_at_rank(peer as i32)
            .immediate_send_with_tag(StaticScope, data, tag.as_u16() as Tag);
        Ok(MpiSend { request, buf: raw })
    }

    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Result<MpiRecv, CommError> {
        self.check_peer(peer)?;
        let raw = Box::into_raw(vec![0u8; len].into_boxed_slice());
        // SAFETY: `raw` stays allocated until `MpiRecv::wait` reclaims it.
        let data: &'static mut [u8] = unsafe { &mut *raw };
        let request = self
            .world
            .process_at_rank(peer as i32)
            .immediate_receive_into_with_tag(StaticScope, data, tag.as_u16() as Tag);
        Ok(MpiRecv { request, buf: raw })
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.world.barrier();
        Ok(())
    }

    fn abort(&self) {
        log::error!("rank {} aborting MPI job", self.rank);
        self.world.abort(1)
    }
}
