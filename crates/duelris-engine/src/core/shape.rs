//! Static piece shape catalog.
//!
//! Every piece kind has up to four orientations stored as 4×4 occupancy masks.
//! The rotation system decides how many of those orientations a kind actually
//! cycles through, so the same tables serve both the modern and the classic
//! ruleset:
//!
//! | kind    | modern | classic |
//! |---------|--------|---------|
//! | O       | 1      | 1       |
//! | I, S, Z | 4      | 2       |
//! | T, J, L | 4      | 4       |
//!
//! Callers never branch on the rotation system; they ask it for
//! [`RotationSystem::state_count`] and index the catalog with the result.

use serde::{Deserialize, Serialize};

use super::piece::PieceKind;

/// Occupancy of a piece inside its 4×4 bounding box.
///
/// Element `dy` is a row, bit `dx` of that row is set when the cell is occupied.
pub type ShapeMask = [u8; 4];

/// Selects the orientation table used by a ruleset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationSystem {
    /// Four orientations for every kind except O.
    #[default]
    Modern,
    /// Reduced table: I, S and Z toggle between two orientations.
    Classic,
}

impl RotationSystem {
    /// Returns the number of distinct orientations `kind` cycles through.
    #[must_use]
    pub const fn state_count(self, kind: PieceKind) -> u8 {
        match (self, kind) {
            (_, PieceKind::O) => 1,
            (RotationSystem::Classic, PieceKind::I | PieceKind::S | PieceKind::Z) => 2,
            _ => 4,
        }
    }

    /// Returns the orientation following `rotation` for `kind`.
    #[must_use]
    pub const fn next_rotation(self, kind: PieceKind, rotation: u8) -> u8 {
        (rotation + 1) % self.state_count(kind)
    }
}

/// Offsets tried, in order, when a rotated piece collides.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickPolicy {
    /// The rotation is rejected if the rotated piece collides in place.
    None,
    /// Shift by one column either way, then one row up combined with a column shift.
    #[default]
    Basic,
}

impl KickPolicy {
    /// Returns the `(dx, dy)` offsets to try; the first that fits wins.
    #[must_use]
    pub const fn offsets(self) -> &'static [(i8, i8)] {
        match self {
            KickPolicy::None => &[(0, 0)],
            KickPolicy::Basic => &[(0, 0), (-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)],
        }
    }
}

/// Returns the occupancy mask of `kind` in orientation `rotation`.
///
/// `rotation` is taken modulo 4; orientations beyond a rotation system's
/// state count are never produced by the engine.
#[must_use]
pub const fn shape_mask(kind: PieceKind, rotation: u8) -> ShapeMask {
    SHAPES[kind as usize][(rotation % 4) as usize]
}

/// Generates the four clockwise orientations of a mask whose cells fit in a
/// `size`×`size` square anchored at the top-left of the box.
const fn mask_rotations(size: usize, mask: ShapeMask) -> [ShapeMask; 4] {
    let mut rotates = [mask; 4];
    let mut i = 1;
    while i < 4 {
        let mut new_mask = [0; 4];
        let mut y = 0;
        while y < size {
            let mut x = 0;
            while x < size {
                if (rotates[i - 1][size - 1 - x] & (1 << y)) != 0 {
                    new_mask[y] |= 1 << x;
                }
                x += 1;
            }
            y += 1;
        }
        rotates[i] = new_mask;
        i += 1;
    }
    rotates
}

const SHAPES: [[ShapeMask; 4]; PieceKind::LEN] = {
    const fn m(bits: [bool; 4]) -> u8 {
        let mut mask = 0;
        let mut i = 0;
        while i < 4 {
            if bits[i] {
                mask |= 1 << i;
            }
            i += 1;
        }
        mask
    }

    const C: bool = true;
    const E: bool = false;

    [
        // I-piece
        mask_rotations(4, [0, m([C, C, C, C]), 0, 0]),
        // O-piece, centered in the box and identical in every orientation
        [[m([E, C, C, E]), m([E, C, C, E]), 0, 0]; 4],
        // S-piece
        mask_rotations(3, [m([E, C, C, E]), m([C, C, E, E]), 0, 0]),
        // Z-piece
        mask_rotations(3, [m([C, C, E, E]), m([E, C, C, E]), 0, 0]),
        // J-piece
        mask_rotations(3, [m([C, E, E, E]), m([C, C, C, E]), 0, 0]),
        // L-piece
        mask_rotations(3, [m([E, E, C, E]), m([C, C, C, E]), 0, 0]),
        // T-piece
        mask_rotations(3, [m([E, C, E, E]), m([C, C, C, E]), 0, 0]),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(mask: ShapeMask) -> Vec<(u8, u8)> {
        let mut cells = vec![];
        for (dy, row) in (0..).zip(mask) {
            for dx in 0..4 {
                if row & (1 << dx) != 0 {
                    cells.push((dx, dy));
                }
            }
        }
        cells
    }

    #[test]
    fn every_orientation_has_four_cells() {
        for kind in PieceKind::ALL {
            for rotation in 0..4 {
                assert_eq!(cells(shape_mask(kind, rotation)).len(), 4, "{kind:?}#{rotation}");
            }
        }
    }

    #[test]
    fn classic_table_reduces_state_counts() {
        let classic = RotationSystem::Classic;
        assert_eq!(classic.state_count(PieceKind::O), 1);
        assert_eq!(classic.state_count(PieceKind::I), 2);
        assert_eq!(classic.state_count(PieceKind::S), 2);
        assert_eq!(classic.state_count(PieceKind::Z), 2);
        assert_eq!(classic.state_count(PieceKind::T), 4);
        assert_eq!(classic.state_count(PieceKind::J), 4);
        assert_eq!(classic.state_count(PieceKind::L), 4);

        let modern = RotationSystem::Modern;
        assert_eq!(modern.state_count(PieceKind::O), 1);
        assert_eq!(modern.state_count(PieceKind::I), 4);
        assert_eq!(modern.state_count(PieceKind::S), 4);
    }

    #[test]
    fn rotation_wraps_modulo_state_count() {
        let classic = RotationSystem::Classic;
        assert_eq!(classic.next_rotation(PieceKind::I, 0), 1);
        assert_eq!(classic.next_rotation(PieceKind::I, 1), 0);
        assert_eq!(classic.next_rotation(PieceKind::O, 0), 0);
        assert_eq!(RotationSystem::Modern.next_rotation(PieceKind::T, 3), 0);
    }

    #[test]
    fn known_orientations() {
        // I lies on row 1, stands on column 2 after one clockwise turn
        assert_eq!(cells(shape_mask(PieceKind::I, 0)), [(0, 1), (1, 1), (2, 1), (3, 1)]);
        assert_eq!(cells(shape_mask(PieceKind::I, 1)), [(2, 0), (2, 1), (2, 2), (2, 3)]);
        // T points up at spawn, right after one turn
        assert_eq!(cells(shape_mask(PieceKind::T, 0)), [(1, 0), (0, 1), (1, 1), (2, 1)]);
        assert_eq!(cells(shape_mask(PieceKind::T, 1)), [(1, 0), (1, 1), (2, 1), (1, 2)]);
        // O occupies the middle two columns
        assert_eq!(cells(shape_mask(PieceKind::O, 2)), [(1, 0), (2, 0), (1, 1), (2, 1)]);
    }

    #[test]
    fn kick_order() {
        assert_eq!(KickPolicy::None.offsets(), &[(0, 0)]);
        assert_eq!(
            KickPolicy::Basic.offsets(),
            &[(0, 0), (-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)]
        );
    }
}
