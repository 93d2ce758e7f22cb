//! In-process backend: one thread per rank, one shared mailbox.
//!
//! Sends are buffered into the mailbox and never block. Receives block in
//! `wait` until a message with the matching `(source, destination, tag)`
//! key is available. `abort` flags the group and wakes every blocked
//! receiver and barrier participant.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use super::{CommError, CommTag, Communicator, Wait};

type Key = (usize, usize, CommTag); // (src, dst, tag)

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    mailbox: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    delivered: Condvar,
    barrier: Mutex<BarrierState>,
    released: Condvar,
    aborted: AtomicBool,
}

impl Shared {
    fn check_open(&self) -> Result<(), CommError> {
        if self.aborted.load(Ordering::Acquire) {
            Err(CommError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Factory for the communicators of one in-process group.
#[derive(Debug, Clone)]
pub struct LocalUniverse {
    shared: Arc<Shared>,
}

impl LocalUniverse {
    /// Group of `size` ranks.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a process group needs at least one rank");
        Self {
            shared: Arc::new(Shared {
                size,
                mailbox: Mutex::new(HashMap::new()),
                delivered: Condvar::new(),
                barrier: Mutex::new(BarrierState::default()),
                released: Condvar::new(),
                aborted: AtomicBool::new(false),
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.shared.size
    }

    /// Communicator for `rank`.
    pub fn comm(&self, rank: usize) -> LocalComm {
        assert!(rank < self.shared.size, "rank {rank} outside group");
        LocalComm {
            rank,
            shared: Arc::clone(&self.shared),
        }
    }

    /// One communicator per rank, in rank order.
    pub fn comms(&self) -> Vec<LocalComm> {
        (0..self.shared.size).map(|r| self.comm(r)).collect()
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::Acquire)
    }
}

/// Rank-local endpoint of a [`LocalUniverse`].
#[derive(Debug, Clone)]
pub struct LocalComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalComm {
    /// Communicator for a single-process run.
    pub fn solo() -> Self {
        LocalUniverse::new(1).comm(0)
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer >= self.shared.size {
            return Err(CommError::InvalidRank {
                rank: peer,
                size: self.shared.size,
            });
        }
        Ok(())
    }
}

/// Pending receive on a [`LocalComm`].
#[derive(Debug)]
pub struct LocalRecv {
    shared: Arc<Shared>,
    key: Key,
    len: usize,
}

impl Wait for LocalRecv {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        let mut mailbox = self.shared.mailbox.lock();
        loop {
            self.shared.check_open()?;
            if let Some(msg) = mailbox.get_mut(&self.key).and_then(VecDeque::pop_front) {
                if msg.len() != self.len {
                    return Err(CommError::LengthMismatch {
                        peer: self.key.0,
                        tag: self.key.2,
                        expected: self.len,
                        actual: msg.len(),
                    });
                }
                return Ok(Some(msg.to_vec()));
            }
            self.shared.delivered.wait(&mut mailbox);
        }
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), CommError> {
        self.shared.check_open()?;
        self.check_peer(peer)?;
        let mut mailbox = self.shared.mailbox.lock();
        mailbox
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.shared.delivered.notify_all();
        Ok(())
    }

    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Result<LocalRecv, CommError> {
        self.shared.check_open()?;
        self.check_peer(peer)?;
        Ok(LocalRecv {
            shared: Arc::clone(&self.shared),
            key: (peer, self.rank, tag),
            len,
        })
    }

    fn barrier(&self) -> Result<(), CommError> {
        let mut state = self.shared.barrier.lock();
        self.shared.check_open()?;
        state.arrived += 1;
        if state.arrived == self.shared.size {
            state.arrived = 0;
            state.generation += 1;
            self.shared.released.notify_all();
            return Ok(());
        }
        let generation = state.generation;
        while state.generation == generation {
            self.shared.check_open()?;
            self.shared.released.wait(&mut state);
        }
        Ok(())
    }

    fn abort(&self) {
        if self.shared.aborted.swap(true, Ordering::AcqRel) {
            return;
        }
        log::error!("rank {} aborting process group", self.rank);
        // Take each lock before notifying so no waiter misses the flag.
        drop(self.shared.mailbox.lock());
        self.shared.delivered.notify_all();
        drop(self.shared.barrier.lock());
        self.shared.released.notify_all();
    }
}
