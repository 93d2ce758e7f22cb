//! One-ring halo exchange between the four torus neighbours.
//!
//! Each round posts four receives and four sends, then waits on all eight
//! together. Waiting on the whole batch is what keeps the round free of the
//! ordering deadlocks a blocking send/receive sequence has on a torus.
//! Halo slots are written only after every transfer has completed, so a
//! failed round never leaves a partially refreshed ring behind.
//!
//! | direction | sent from              | received into  | tag of received data |
//! |-----------|------------------------|----------------|----------------------|
//! | north     | interior row 0         | top halo row   | southward            |
//! | south     | interior row h-1       | bottom halo row| northward            |
//! | west      | interior column 0      | left halo col  | eastward             |
//! | east      | interior column w-1    | right halo col | westward             |
//!
//! Rows carry `pw` values (corners included); columns carry `height` values
//! at stride `pw`, described by a [`VectorLayout`].

use crate::comm::wire::{copy_f64s, f64_bytes};
use crate::comm::{CommTag, Communicator};
use crate::grid::{Grid, Side, VectorLayout};
use crate::heat_error::{GridError, HeatSimError, Phase, Shape};
use crate::topology::{CartTopology, Direction};

/// Where one direction's data comes from and goes to.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Row { send_row: usize, halo: Side },
    Col { send: VectorLayout, recv: VectorLayout },
}

#[derive(Debug, Clone, Copy)]
struct Link {
    dir: Direction,
    peer: usize,
    slot: Slot,
    bytes: usize,
}

/// Precomputed exchange pattern for one process and one grid shape.
///
/// Built once before the iteration loop, like a committed derived datatype,
/// and reused for every round.
#[derive(Debug, Clone)]
pub struct HaloExchange {
    shape: Shape,
    links: [Link; 4],
}

impl HaloExchange {
    pub fn new(topo: &CartTopology, grid: &Grid) -> Result<Self, GridError> {
        if grid.padding() != 1 {
            return Err(GridError::NoHalo);
        }
        let (w, h, pw) = (grid.width(), grid.height(), grid.padded_width());
        let row_bytes = pw * std::mem::size_of::<f64>();
        let col_bytes = h * std::mem::size_of::<f64>();
        let link = |dir: Direction| {
            let (slot, bytes) = match dir {
                Direction::North => (
                    Slot::Row {
                        send_row: 0,
                        halo: Side::Top,
                    },
                    row_bytes,
                ),
                Direction::South => (
                    Slot::Row {
                        send_row: h - 1,
                        halo: Side::Bottom,
                    },
                    row_bytes,
                ),
                Direction::West => (
                    Slot::Col {
                        send: grid.column_layout(1),
                        recv: grid.column_layout(0),
                    },
                    col_bytes,
                ),
                Direction::East => (
                    Slot::Col {
                        send: grid.column_layout(w),
                        recv: grid.column_layout(w + 1),
                    },
                    col_bytes,
                ),
            };
            Link {
                dir,
                peer: topo.neighbor(dir),
                slot,
                bytes,
            }
        };
        Ok(Self {
            shape: grid.shape(),
            links: Direction::ALL.map(link),
        })
    }

    /// Run one exchange round on `grid`.
    pub fn exchange<C: Communicator>(&self, comm: &C, grid: &mut Grid) -> Result<(), HeatSimError> {
        if grid.shape() != self.shape {
            return Err(GridError::ShapeMismatch {
                left: self.shape,
                right: grid.shape(),
            }
            .into());
        }
        let rank = comm.rank();
        let fail = HeatSimError::comm(Phase::Halo, rank);

        // 1) post every receive: data from the `dir` neighbour travels opposite to `dir`
        let mut recvs = Vec::with_capacity(4);
        for l in &self.links {
            let tag = CommTag::halo(l.dir.opposite());
            recvs.push(comm.irecv(l.peer, tag, l.bytes).map_err(fail)?);
        }

        // 2) post every send; the transport copies the packed boundary
        let mut sends = Vec::with_capacity(4);
        for l in &self.links {
            let tag = CommTag::halo(l.dir);
            let handle = match l.slot {
                Slot::Row { send_row, .. } => {
                    comm.isend(l.peer, tag, f64_bytes(grid.interior_row(send_row)))
                }
                Slot::Col { send, .. } => {
                    let packed = grid.strided(send)?.to_bytes();
                    comm.isend(l.peer, tag, &packed)
                }
            };
            sends.push(handle.map_err(fail)?);
        }

        // 3) wait for all eight, then unpack
        let payloads = comm.wait_all(sends, recvs).map_err(fail)?;
        for (l, bytes) in self.links.iter().zip(&payloads) {
            let bad = |detail: String| HeatSimError::Wire {
                what: "halo payload",
                peer: l.peer,
                detail,
            };
            match l.slot {
                Slot::Row { halo, .. } => copy_f64s(bytes, grid.halo_row_mut(halo)?).map_err(bad)?,
                Slot::Col { recv, .. } => grid
                    .strided_mut(recv)?
                    .copy_from_bytes(bytes)
                    .map_err(|e| bad(e.to_string()))?,
            }
        }
        log::trace!("rank {rank}: halo round complete");
        Ok(())
    }
}
