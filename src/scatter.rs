//! Scatter of the initial tiles and gather of the final ones.
//!
//! Wire contract per tile: three metadata messages (width, height, padding as
//! [`WireU32`]) tagged with [`TileField`]s, then one message holding the raw
//! row-major buffer. The receiver cannot size its buffer before the metadata
//! arrives, so a receive is always two waits: metadata batch, then data.
//! Gather needs no metadata: the coordinator already knows every tile shape
//! from its partition table.

use crate::comm::wire::{WIRE_U32_LEN, WireU32, copy_f64s, f64_bytes};
use crate::comm::{CommTag, Communicator, TileField};
use crate::grid::Grid;
use crate::heat_error::{HeatSimError, Phase};
use crate::partition::Cart2d;
use crate::topology::CartTopology;

/// Rank that owns the global field.
pub const COORDINATOR: usize = 0;

const META: [TileField; 3] = [TileField::Width, TileField::Height, TileField::Padding];

/// Coordinator side: send every other rank its tile, return our own.
pub fn scatter_tiles<C: Communicator>(
    comm: &C,
    topo: &CartTopology,
    cart: &Cart2d,
) -> Result<Grid, HeatSimError> {
    let fail = HeatSimError::comm(Phase::Scatter, comm.rank());
    let mut sends = Vec::with_capacity(4 * comm.size());
    for dest in (0..comm.size()).filter(|r| *r != comm.rank()) {
        let (bx, by) = topo.coords_of(dest);
        let tile = cart.get(bx, by)?;
        let meta = [tile.width(), tile.height(), tile.padding()].map(WireU32::new);
        for (field, value) in META.iter().zip(&meta) {
            sends.push(
                comm.isend(dest, CommTag::scatter(*field), value.as_bytes())
                    .map_err(fail)?,
            );
        }
        sends.push(
            comm.isend(dest, CommTag::scatter(TileField::Data), f64_bytes(tile.as_slice()))
                .map_err(fail)?,
        );
        log::debug!("scatter: tile ({bx},{by}) {}x{} -> rank {dest}", tile.width(), tile.height());
    }
    comm.wait_all(sends, Vec::new()).map_err(fail)?;

    let (bx, by) = topo.coords();
    Ok(cart.get(bx, by)?.clone())
}

/// Non-coordinator side: receive metadata, allocate, receive the buffer.
pub fn receive_tile<C: Communicator>(comm: &C, root: usize) -> Result<Grid, HeatSimError> {
    let fail = HeatSimError::comm(Phase::Scatter, comm.rank());
    let mut recvs = Vec::with_capacity(META.len());
    for field in META {
        recvs.push(
            comm.irecv(root, CommTag::scatter(field), WIRE_U32_LEN)
                .map_err(fail)?,
        );
    }
    let raw = comm.wait_all(Vec::new(), recvs).map_err(fail)?;
    let bad = |detail: String| HeatSimError::Wire {
        what: "tile metadata",
        peer: root,
        detail,
    };
    let mut meta = [0usize; 3];
    for (slot, bytes) in meta.iter_mut().zip(&raw) {
        *slot = WireU32::from_bytes(bytes).map_err(bad)?.get();
    }
    let [width, height, padding] = meta;
    let mut tile = Grid::new(width, height, padding).map_err(|e| bad(e.to_string()))?;

    let len = std::mem::size_of_val(tile.as_slice());
    let data = comm
        .irecv(root, CommTag::scatter(TileField::Data), len)
        .map_err(fail)?;
    let payload = comm.wait_all(Vec::new(), vec![data]).map_err(fail)?;
    copy_f64s(&payload[0], tile.as_mut_slice()).map_err(|detail| HeatSimError::Wire {
        what: "tile data",
        peer: root,
        detail,
    })?;
    log::debug!("rank {}: received {width}x{height} tile", comm.rank());
    Ok(tile)
}

/// Every rank: obtain this rank's tile. Only the coordinator passes a table.
pub fn scatter<C: Communicator>(
    comm: &C,
    topo: &CartTopology,
    cart: Option<&Cart2d>,
) -> Result<Grid, HeatSimError> {
    match cart {
        Some(cart) if comm.rank() == COORDINATOR => scatter_tiles(comm, topo, cart),
        None if comm.rank() != COORDINATOR => receive_tile(comm, COORDINATOR),
        _ => Err(HeatSimError::Config(format!(
            "rank {} {} a partition table",
            comm.rank(),
            if cart.is_some() { "must not hold" } else { "needs" }
        ))),
    }
}

/// Every rank: send the interior of `local` to the coordinator, which stores
/// each tile in its partition table.
pub fn gather<C: Communicator>(
    comm: &C,
    topo: &CartTopology,
    local: &Grid,
    cart: Option<&mut Cart2d>,
) -> Result<(), HeatSimError> {
    let fail = HeatSimError::comm(Phase::Gather, comm.rank());
    let Some(cart) = cart else {
        let tile = local.pad(0)?;
        let send = comm
            .isend(COORDINATOR, CommTag::GATHER, f64_bytes(tile.as_slice()))
            .map_err(fail)?;
        comm.wait_all(vec![send], Vec::new()).map_err(fail)?;
        return Ok(());
    };

    let peers: Vec<usize> = (0..comm.size()).filter(|r| *r != comm.rank()).collect();
    let mut recvs = Vec::with_capacity(peers.len());
    for &src in &peers {
        let (bx, by) = topo.coords_of(src);
        let len = cart.get(bx, by)?.area() * std::mem::size_of::<f64>();
        recvs.push(comm.irecv(src, CommTag::GATHER, len).map_err(fail)?);
    }
    let payloads = comm.wait_all(Vec::new(), recvs).map_err(fail)?;
    for (&src, bytes) in peers.iter().zip(&payloads) {
        let (bx, by) = topo.coords_of(src);
        let tile = cart.get_mut(bx, by)?;
        copy_f64s(bytes, tile.as_mut_slice()).map_err(|detail| HeatSimError::Wire {
            what: "gathered tile",
            peer: src,
            detail,
        })?;
    }
    let (bx, by) = topo.coords();
    cart.get_mut(bx, by)?.copy_from(local)?;
    log::debug!("gather: {} tiles collected", peers.len() + 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalUniverse;

    #[test]
    fn scatter_then_gather_round_trips() {
        let (dimx, dimy) = (3, 2);
        let field = Grid::from_fn(7, 5, |x, y| (y * 7 + x) as f64).unwrap();
        let universe = LocalUniverse::new(dimx * dimy);
        let comms = universe.comms();
        let merged = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    let field = &field;
                    s.spawn(move || {
                        let topo = CartTopology::build(comm.rank(), comm.size(), dimx, dimy).unwrap();
                        let mut cart = (comm.rank() == COORDINATOR).then(|| {
                            let mut cart = Cart2d::new(7, 5, dimx, dimy).unwrap();
                            cart.split(field).unwrap();
                            cart
                        });
                        let tile = scatter(comm, &topo, cart.as_ref()).unwrap();
                        let local = tile.pad(1).unwrap();
                        if let Some(cart) = cart.as_mut() {
                            for (bx, by) in (0..dimy).flat_map(|by| (0..dimx).map(move |bx| (bx, by))) {
                                cart.get_mut(bx, by).unwrap().as_mut_slice().fill(-1.0);
                            }
                        }
                        gather(comm, &topo, &local, cart.as_mut()).unwrap();
                        cart.map(|cart| {
                            let mut out = Grid::new(7, 5, 0).unwrap();
                            cart.merge(&mut out).unwrap();
                            out
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .next()
        });
        assert_eq!(merged.unwrap(), field);
    }

    #[test]
    fn coordinator_needs_a_table() {
        let comm = crate::comm::LocalComm::solo();
        let topo = CartTopology::build(0, 1, 1, 1).unwrap();
        assert!(matches!(scatter(&comm, &topo, None), Err(HeatSimError::Config(_))));
    }

    #[test]
    fn malformed_metadata_is_a_wire_error() {
        let universe = LocalUniverse::new(2);
        let (root, leaf) = (universe.comm(0), universe.comm(1));
        for field in META {
            let v = if field == TileField::Width { 0 } else { 1 };
            root.isend(1, CommTag::scatter(field), WireU32::new(v).as_bytes())
                .unwrap();
        }
        assert!(matches!(
            receive_tile(&leaf, 0),
            Err(HeatSimError::Wire { what: "tile metadata", peer: 0, .. })
        ));
    }
}
