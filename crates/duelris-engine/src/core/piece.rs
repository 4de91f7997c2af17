use std::{fmt, str::FromStr};

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::{
    GRID_WIDTH,
    shape::{RotationSystem, ShapeMask, shape_mask},
};

/// A falling piece: kind, orientation and position of its 4×4 bounding box.
///
/// Pieces are plain values. Movement and rotation return new pieces and never
/// look at the grid; the grid decides whether a piece is legal
/// (see [`Grid::is_colliding`](super::Grid::is_colliding)).
///
/// # Coordinate System
///
/// - `x` grows to the right, `y` grows downward
/// - `(x, y)` is the top-left corner of the bounding box
/// - `y` may be negative while the piece is still entering the playfield
///
/// # Example
///
/// ```
/// use duelris_engine::{Piece, PieceKind, RotationSystem};
///
/// let piece = Piece::spawn(PieceKind::T, 0);
/// let moved = piece.moved(-1, 0);
/// let rotated = moved.rotated(RotationSystem::Modern);
/// assert_eq!(rotated.rotation(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    kind: PieceKind,
    rotation: u8,
    x: i8,
    y: i8,
}

/// Why a piece string like `T1@3,-1` was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid piece '{input}': expected <kind><rotation>@<x>,<y>")]
pub struct ParsePieceError {
    #[error(not(source))]
    input: String,
}

/// Compact text form `<kind><rotation>@<x>,<y>`, e.g. `T1@3,-1`.
impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}@{},{}", self.kind.as_char(), self.rotation, self.x, self.y)
    }
}

impl FromStr for Piece {
    type Err = ParsePieceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = || {
            let mut chars = s.chars();
            let kind = PieceKind::from_char(chars.next()?)?;
            let (rotation, position) = chars.as_str().split_once('@')?;
            let rotation = rotation.parse::<u8>().ok().filter(|r| *r < 4)?;
            let (x, y) = position.split_once(',')?;
            Some(Piece::new(kind, rotation, x.parse().ok()?, y.parse().ok()?))
        };
        parse().ok_or_else(|| ParsePieceError {
            input: s.to_owned(),
        })
    }
}

impl Serialize for Piece {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Piece {
    #[must_use]
    pub const fn new(kind: PieceKind, rotation: u8, x: i8, y: i8) -> Self {
        Self {
            kind,
            rotation,
            x,
            y,
        }
    }

    /// Creates a piece in its spawn orientation at the kind's spawn column.
    ///
    /// I and O spawn one column right of the other kinds.
    #[must_use]
    pub const fn spawn(kind: PieceKind, row: i8) -> Self {
        Self::new(kind, 0, kind.spawn_column(), row)
    }

    #[must_use]
    pub const fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub const fn rotation(&self) -> u8 {
        self.rotation
    }

    #[must_use]
    pub const fn x(&self) -> i8 {
        self.x
    }

    #[must_use]
    pub const fn y(&self) -> i8 {
        self.y
    }

    #[must_use]
    pub const fn mask(&self) -> ShapeMask {
        shape_mask(self.kind, self.rotation)
    }

    /// Returns the absolute `(x, y)` of each occupied cell.
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> + use<> {
        let (x, y) = (self.x, self.y);
        self.kind
            .occupied_offsets(self.rotation)
            .map(move |(dx, dy)| (x + dx, y + dy))
    }

    #[must_use]
    pub const fn moved(&self, dx: i8, dy: i8) -> Self {
        Self::new(self.kind, self.rotation, self.x + dx, self.y + dy)
    }

    #[must_use]
    pub const fn with_rotation(&self, rotation: u8) -> Self {
        Self::new(self.kind, rotation, self.x, self.y)
    }

    #[must_use]
    pub const fn with_column(&self, x: i8) -> Self {
        Self::new(self.kind, self.rotation, x, self.y)
    }

    /// Returns the piece turned one orientation clockwise under `system`.
    #[must_use]
    pub const fn rotated(&self, system: RotationSystem) -> Self {
        self.with_rotation(system.next_rotation(self.kind, self.rotation))
    }
}

/// Enum representing the type of piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// S-piece.
    S = 2,
    /// Z-piece.
    Z = 3,
    /// J-piece.
    J = 4,
    /// L-piece.
    L = 5,
    /// T-piece.
    T = 6,
}

impl Distribution<PieceKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceKind {
        PieceKind::ALL[rng.random_range(0..PieceKind::LEN)]
    }
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    const CENTER_COLUMN: i8 = (GRID_WIDTH as i8 - 4) / 2;

    #[must_use]
    pub const fn spawn_column(self) -> i8 {
        match self {
            PieceKind::I | PieceKind::O => Self::CENTER_COLUMN + 1,
            _ => Self::CENTER_COLUMN,
        }
    }

    /// Returns the `(dx, dy)` offsets of the occupied cells in `rotation`,
    /// row by row from the top of the bounding box.
    pub fn occupied_offsets(self, rotation: u8) -> impl Iterator<Item = (i8, i8)> + use<> {
        let mask = shape_mask(self, rotation);
        (0..4i8).flat_map(move |dy| {
            let row = mask[dy.unsigned_abs() as usize];
            (0..4i8).filter_map(move |dx| (row & (1 << dx) != 0).then_some((dx, dy)))
        })
    }

    /// Returns the leftmost and rightmost occupied `dx` in `rotation`.
    #[must_use]
    pub fn column_span(self, rotation: u8) -> (i8, i8) {
        self.occupied_offsets(rotation)
            .fold((i8::MAX, i8::MIN), |(lo, hi), (dx, _)| {
                (lo.min(dx), hi.max(dx))
            })
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use duelris_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    /// Parses a piece kind from a single character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}
