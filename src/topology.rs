//! Periodic 2D Cartesian process topology.
//!
//! Processes are laid out on a `dimx x dimy` torus with row-major numbering,
//! `rank = cy * dimx + cx`. North/south shift the y coordinate, west/east
//! shift x, and both axes wrap around.

use std::fmt;

use crate::heat_error::TopologyError;

/// One of the four nearest-neighbour directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// `(dx, dy)` step on the process grid; north is `y - 1`.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        f.write_str(s)
    }
}

/// Immutable per-process view of the Cartesian embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTopology {
    rank: usize,
    dims: (usize, usize),
    coords: (usize, usize),
    north: usize,
    south: usize,
    east: usize,
    west: usize,
}

impl CartTopology {
    /// Place `rank` on a periodic `dimx x dimy` grid of `processes` ranks.
    pub fn build(
        rank: usize,
        processes: usize,
        dimx: usize,
        dimy: usize,
    ) -> Result<Self, TopologyError> {
        if dimx == 0 || dimy == 0 || dimx * dimy != processes {
            return Err(TopologyError::SizeMismatch {
                dimx,
                dimy,
                processes,
            });
        }
        if rank >= processes {
            return Err(TopologyError::RankOutOfRange { rank, processes });
        }
        let dims = (dimx, dimy);
        let coords = coords_of(dims, rank);
        let at = |d: Direction| shifted_rank(dims, coords, d);
        Ok(Self {
            rank,
            dims,
            coords,
            north: at(Direction::North),
            south: at(Direction::South),
            east: at(Direction::East),
            west: at(Direction::West),
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.dims.0 * self.dims.1
    }

    /// `(dimx, dimy)`.
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    /// `(cx, cy)` of this process.
    pub fn coords(&self) -> (usize, usize) {
        self.coords
    }

    pub fn neighbor(&self, dir: Direction) -> usize {
        match dir {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    /// Rank at block coordinate `(cx, cy)`, wrapped onto the torus.
    pub fn rank_at(&self, cx: isize, cy: isize) -> usize {
        let (dimx, dimy) = self.dims;
        let x = cx.rem_euclid(dimx as isize) as usize;
        let y = cy.rem_euclid(dimy as isize) as usize;
        y * dimx + x
    }

    /// Block coordinate of any rank in this topology.
    pub fn coords_of(&self, rank: usize) -> (usize, usize) {
        coords_of(self.dims, rank)
    }
}

impl fmt::Display for CartTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rank={} coords=({},{}) north={} south={} west={} east={}",
            self.rank, self.coords.0, self.coords.1, self.north, self.south, self.west, self.east
        )
    }
}

fn coords_of((dimx, _): (usize, usize), rank: usize) -> (usize, usize) {
    (rank % dimx, rank / dimx)
}

fn shifted_rank(dims: (usize, usize), (cx, cy): (usize, usize), dir: Direction) -> usize {
    let (dx, dy) = dir.offset();
    let x = (cx as isize + dx).rem_euclid(dims.0 as isize) as usize;
    let y = (cy as isize + dy).rem_euclid(dims.1 as isize) as usize;
    y * dims.0 + x
}
