//! Axial hex-coordinate math.
//!
//! Coordinates are stored as `(q, r)` with the third cube component derived as
//! `s = -q - r`. All operations here are pure and total.
//!
//! Neighbor directions are enumerated in a fixed order that other modules rely
//! on (ring walks, wound-bonus geometry, direction parsing):
//! `Left, TopLeft, TopRight, Right, BottomRight, BottomLeft`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// One of the six hex neighbor directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// `(-1, 0)`
    Left,
    /// `(0, -1)`
    TopLeft,
    /// `(1, -1)`
    TopRight,
    /// `(1, 0)`
    Right,
    /// `(0, 1)`
    BottomRight,
    /// `(-1, 1)`
    BottomLeft,
}

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Left,
        Self::TopLeft,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::BottomLeft,
    ];

    /// Axial offset `(dq, dr)` for this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::TopLeft => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (0, 1),
            Self::BottomLeft => (-1, 1),
        }
    }

    /// The direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::Right => Self::Left,
            Self::BottomRight => Self::TopLeft,
            Self::BottomLeft => Self::TopRight,
        }
    }

    /// Short code used in move notation (`L`, `TL`, ...).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::TopLeft => "TL",
            Self::TopRight => "TR",
            Self::Right => "R",
            Self::BottomRight => "BR",
            Self::BottomLeft => "BL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = GameError;

    /// Accepts short codes and the long aliases (`LEFT`, `TOPLEFT`, `UL`, ...),
    /// case-insensitively.
    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "L" | "LEFT" => Ok(Self::Left),
            "TL" | "LU" | "UL" | "TOPLEFT" | "UPPERLEFT" => Ok(Self::TopLeft),
            "TR" | "RU" | "UR" | "TOPRIGHT" | "UPPERRIGHT" => Ok(Self::TopRight),
            "R" | "RIGHT" => Ok(Self::Right),
            "BR" | "RD" | "DR" | "BOTTOMRIGHT" | "DOWNRIGHT" => Ok(Self::BottomRight),
            "BL" | "LD" | "DL" | "BOTTOMLEFT" | "DOWNLEFT" => Ok(Self::BottomLeft),
            other => Err(GameError::Validation(format!("unknown direction '{other}'"))),
        }
    }
}

/// Axial hex coordinate.
///
/// Ordering is by `q` then `r`; it only exists to give maps and tie-breaks a
/// stable iteration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct AxialCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl AxialCoord {
    /// The origin `(0, 0)`.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Create a coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Derived third cube component.
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Offset by an arbitrary axial delta.
    #[must_use]
    pub const fn plus(self, dq: i32, dr: i32) -> Self {
        Self::new(self.q + dq, self.r + dr)
    }

    /// Adjacent coordinate in `dir`.
    #[must_use]
    pub const fn neighbor(self, dir: Direction) -> Self {
        let (dq, dr) = dir.offset();
        self.plus(dq, dr)
    }

    /// All six neighbors in canonical direction order.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        Direction::ALL.map(|d| self.neighbor(d))
    }

    /// Hex distance: `(|dq| + |dr| + |ds|) / 2`.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        let dq = self.q.abs_diff(other.q);
        let dr = self.r.abs_diff(other.r);
        let ds = self.s().abs_diff(other.s());
        (dq + dr + ds) / 2
    }

    /// Direction from `self` to `other`, if they are adjacent.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        let delta = (other.q - self.q, other.r - self.r);
        Direction::ALL.into_iter().find(|d| d.offset() == delta)
    }

    /// Every coordinate within `radius` (inclusive), using the cube sweep.
    ///
    /// Yields `1 + 3 * radius * (radius + 1)` coordinates.
    #[must_use]
    pub fn range(self, radius: u32) -> Vec<Self> {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX / 4);
        let mut results = Vec::new();
        for dq in -radius..=radius {
            let r1 = (-radius).max(-dq - radius);
            let r2 = radius.min(-dq + radius);
            for dr in r1..=r2 {
                results.push(self.plus(dq, dr));
            }
        }
        results
    }

    /// Every coordinate exactly `radius` away.
    ///
    /// Starts `radius` steps to the left and walks the ring clockwise. A
    /// radius of zero yields just `self`.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Self> {
        if radius == 0 {
            return vec![self];
        }
        let mut coord = self;
        for _ in 0..radius {
            coord = coord.neighbor(Direction::Left);
        }
        let walk = [
            Direction::TopRight,
            Direction::Right,
            Direction::BottomRight,
            Direction::BottomLeft,
            Direction::Left,
            Direction::TopLeft,
        ];
        let mut results = Vec::with_capacity(6 * radius as usize);
        for dir in walk {
            for _ in 0..radius {
                results.push(coord);
                coord = coord.neighbor(dir);
            }
        }
        results
    }

    /// Map key form `"q,r"`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{},{}", self.q, self.r)
    }

    /// Parse the `"q,r"` key form.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if the key is not two comma-separated integers.
    pub fn parse_key(key: &str) -> Result<Self> {
        let invalid = || GameError::Validation(format!("invalid coordinate key '{key}'"));
        let (q, r) = key.split_once(',').ok_or_else(invalid)?;
        let q = q.trim().parse::<i32>().map_err(|_| invalid())?;
        let r = r.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self::new(q, r))
    }

    /// Convert to odd-row offset `(row, col)` for display grids.
    #[must_use]
    pub const fn to_row_col(self) -> (i32, i32) {
        let row = self.r;
        let col = self.q + (self.r - (self.r & 1)) / 2;
        (row, col)
    }

    /// Inverse of [`AxialCoord::to_row_col`].
    #[must_use]
    pub const fn from_row_col(row: i32, col: i32) -> Self {
        Self::new(col - (row - (row & 1)) / 2, row)
    }
}

impl fmt::Display for AxialCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

impl From<(i32, i32)> for AxialCoord {
    fn from((q, r): (i32, i32)) -> Self {
        Self::new(q, r)
    }
}
