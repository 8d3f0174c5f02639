use crate::error::{Error, Result};

/// One of the four toroidal neighbour directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
    ];

    /// Map a cell value to a direction (`value mod 4`).
    ///
    /// Copy instructions use the last cell of the executing program's tape
    /// as the selector, so the target changes as the program rewrites itself.
    #[inline]
    pub fn from_selector(value: u32) -> Self {
        Self::ALL[(value % 4) as usize]
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }
}

/// A `width x height` torus of programs, indexed row-major (`y * width + x`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridTopology {
    width: usize,
    height: usize,
}

impl GridTopology {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!(
                "grid dimensions must be positive, got {width}x{height}"
            )));
        }
        width.checked_mul(height).ok_or_else(|| {
            Error::Config(format!("grid {width}x{height} overflows the program count"))
        })?;
        Ok(Self { width, height })
    }

    /// The square world: `world_size x world_size` programs.
    pub fn square(world_size: usize) -> Result<Self> {
        Self::new(world_size, world_size)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of programs.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Toroidal neighbour of `idx`. Every index has exactly one neighbour
    /// per direction; on a 1-wide or 1-tall torus that may be `idx` itself.
    #[inline]
    pub fn neighbor(&self, idx: usize, direction: Direction) -> usize {
        let w = self.width;
        let n = self.len();
        match direction {
            Direction::East => {
                if idx % w == w - 1 {
                    idx - (w - 1)
                } else {
                    idx + 1
                }
            }
            Direction::West => {
                if idx % w == 0 {
                    idx + (w - 1)
                } else {
                    idx - 1
                }
            }
            Direction::South => {
                if idx >= n - w {
                    idx - (n - w)
                } else {
                    idx + w
                }
            }
            Direction::North => {
                if idx < w {
                    idx + (n - w)
                } else {
                    idx - w
                }
            }
        }
    }
}
