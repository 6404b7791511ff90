//! Pad-grid note translation
//!
//! Views address pads through a linear grid range (notes 36..100, row-major
//! from the bottom-left pad). Devices address them by their own note and
//! channel, usually in a different order. A [`GridTranslation`] holds both
//! directions, built once and validated on construction.

use crate::error::CodecError;
use std::collections::HashMap;

/// First grid note
pub const GRID_BASE: u8 = 36;
/// Number of grid notes
pub const GRID_SIZE: usize = 64;

/// Note and channel as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceNote {
    pub channel: u8,
    pub note: u8,
}

impl DeviceNote {
    pub const fn new(channel: u8, note: u8) -> Self {
        Self { channel, note }
    }
}

/// Physical pad matrix, rows counted from the bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadMatrix {
    pub rows: usize,
    pub columns: usize,
}

impl PadMatrix {
    pub const SQUARE_8X8: PadMatrix = PadMatrix { rows: 8, columns: 8 };
    pub const WIDE_4X16: PadMatrix = PadMatrix { rows: 4, columns: 16 };
}

/// Order in which grid notes walk the pad matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLayout {
    /// Row-major across the full width
    Linear,
    /// Left half bottom-to-top, then right half
    InterleavedHalves,
    /// 4x4 blocks, left-to-right then bottom-to-top
    Quadrants,
}

impl GridLayout {
    /// Pad position (row from bottom, column) of grid offset `index`
    pub fn position(self, matrix: PadMatrix, index: usize) -> (usize, usize) {
        match self {
            GridLayout::Linear => (index / matrix.columns, index % matrix.columns),
            GridLayout::InterleavedHalves => {
                let half_width = matrix.columns / 2;
                let half_size = GRID_SIZE / 2;
                let (half, i) = (index / half_size, index % half_size);
                (i / half_width, half * half_width + i % half_width)
            }
            GridLayout::Quadrants => {
                let blocks_across = matrix.columns / 4;
                let (block, i) = (index / 16, index % 16);
                let (block_row, block_col) = (block / blocks_across, block % blocks_across);
                (block_row * 4 + i / 4, block_col * 4 + i % 4)
            }
        }
    }
}

/// Bidirectional grid note <-> device note table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTranslation {
    forward: [Option<DeviceNote>; GRID_SIZE],
    inverse: HashMap<DeviceNote, u8>,
}

impl GridTranslation {
    /// Build from explicit `(grid note, device note)` pairs
    pub fn from_pairs(pairs: &[(u8, DeviceNote)]) -> Result<Self, CodecError> {
        let mut forward = [None; GRID_SIZE];
        let mut inverse = HashMap::with_capacity(pairs.len());

        for &(grid_note, device) in pairs {
            let offset = grid_offset(grid_note).ok_or(CodecError::GridNoteOutOfRange(grid_note))?;
            if forward[offset].is_some() {
                return Err(CodecError::DuplicateGridNote(grid_note));
            }
            if inverse.insert(device, grid_note).is_some() {
                return Err(CodecError::DuplicateDeviceNote {
                    channel: device.channel,
                    note: device.note,
                });
            }
            forward[offset] = Some(device);
        }

        Ok(Self { forward, inverse })
    }

    /// Build a full table by walking `matrix` in `layout` order
    pub fn for_layout(
        layout: GridLayout,
        matrix: PadMatrix,
        pad_note: impl Fn(usize, usize) -> DeviceNote,
    ) -> Result<Self, CodecError> {
        let pairs: Vec<(u8, DeviceNote)> = (0..GRID_SIZE)
            .map(|index| {
                let (row, column) = layout.position(matrix, index);
                (GRID_BASE + index as u8, pad_note(row, column))
            })
            .collect();
        Self::from_pairs(&pairs)
    }

    /// Device note for a grid note
    pub fn translate_to_controller(&self, grid_note: u8) -> Option<DeviceNote> {
        grid_offset(grid_note).and_then(|offset| self.forward[offset])
    }

    /// Grid note for a device note
    pub fn translate_to_grid(&self, device: DeviceNote) -> Option<u8> {
        self.inverse.get(&device).copied()
    }

    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }

    /// Mapped pairs in grid order
    pub fn iter(&self) -> impl Iterator<Item = (u8, DeviceNote)> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter_map(|(offset, device)| device.map(|d| (GRID_BASE + offset as u8, d)))
    }
}

fn grid_offset(grid_note: u8) -> Option<usize> {
    let offset = grid_note.checked_sub(GRID_BASE)? as usize;
    (offset < GRID_SIZE).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LAYOUTS: [GridLayout; 3] = [
        GridLayout::Linear,
        GridLayout::InterleavedHalves,
        GridLayout::Quadrants,
    ];

    fn launchpad_note(row: usize, column: usize) -> DeviceNote {
        DeviceNote::new(0, ((row + 1) * 10 + column + 1) as u8)
    }

    fn fire_note(row: usize, column: usize) -> DeviceNote {
        DeviceNote::new(0, (54 + (3 - row) * 16 + column) as u8)
    }

    fn all_tables() -> Vec<GridTranslation> {
        let mut tables = Vec::new();
        for layout in LAYOUTS {
            tables.push(
                GridTranslation::for_layout(layout, PadMatrix::SQUARE_8X8, launchpad_note).unwrap(),
            );
            tables.push(GridTranslation::for_layout(layout, PadMatrix::WIDE_4X16, fire_note).unwrap());
        }
        tables
    }

    #[test]
    fn test_every_table_round_trips_exhaustively() {
        for table in all_tables() {
            assert_eq!(table.len(), GRID_SIZE);
            for grid_note in GRID_BASE..GRID_BASE + GRID_SIZE as u8 {
                let device = table.translate_to_controller(grid_note).unwrap();
                assert_eq!(table.translate_to_grid(device), Some(grid_note));
            }
        }
    }

    #[test]
    fn test_linear_launchpad_corners() {
        let table =
            GridTranslation::for_layout(GridLayout::Linear, PadMatrix::SQUARE_8X8, launchpad_note)
                .unwrap();
        assert_eq!(table.translate_to_controller(36), Some(DeviceNote::new(0, 11)));
        assert_eq!(table.translate_to_controller(43), Some(DeviceNote::new(0, 18)));
        assert_eq!(table.translate_to_controller(99), Some(DeviceNote::new(0, 88)));
    }

    #[test]
    fn test_interleaved_halves_order() {
        let table = GridTranslation::for_layout(
            GridLayout::InterleavedHalves,
            PadMatrix::SQUARE_8X8,
            launchpad_note,
        )
        .unwrap();
        // Left half fills first, four pads per row
        assert_eq!(table.translate_to_controller(39), Some(DeviceNote::new(0, 14)));
        assert_eq!(table.translate_to_controller(40), Some(DeviceNote::new(0, 21)));
        // Right half starts back at the bottom row
        assert_eq!(table.translate_to_controller(68), Some(DeviceNote::new(0, 15)));
    }

    #[test]
    fn test_quadrants_on_fire() {
        let table =
            GridTranslation::for_layout(GridLayout::Quadrants, PadMatrix::WIDE_4X16, fire_note)
                .unwrap();
        // Bottom-left pad of the Fire is note 102
        assert_eq!(table.translate_to_controller(36), Some(DeviceNote::new(0, 102)));
        assert_eq!(table.translate_to_controller(40), Some(DeviceNote::new(0, 86)));
        assert_eq!(table.translate_to_controller(52), Some(DeviceNote::new(0, 106)));
    }

    #[test]
    fn test_out_of_range() {
        let table = &all_tables()[0];
        assert_eq!(table.translate_to_controller(35), None);
        assert_eq!(table.translate_to_controller(100), None);
        assert_eq!(table.translate_to_grid(DeviceNote::new(5, 11)), None);
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup_device = [(36, DeviceNote::new(0, 1)), (37, DeviceNote::new(0, 1))];
        assert_eq!(
            GridTranslation::from_pairs(&dup_device),
            Err(CodecError::DuplicateDeviceNote { channel: 0, note: 1 })
        );
        let dup_grid = [(36, DeviceNote::new(0, 1)), (36, DeviceNote::new(0, 2))];
        assert_eq!(
            GridTranslation::from_pairs(&dup_grid),
            Err(CodecError::DuplicateGridNote(36))
        );
        assert_eq!(
            GridTranslation::from_pairs(&[(100, DeviceNote::new(0, 1))]),
            Err(CodecError::GridNoteOutOfRange(100))
        );
    }

    #[test]
    fn test_partial_table() {
        let table = GridTranslation::from_pairs(&[(50, DeviceNote::new(9, 36))]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.translate_to_controller(36), None);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![(50, DeviceNote::new(9, 36))]);
    }

    proptest! {
        #[test]
        fn prop_round_trip(layout_idx in 0usize..3, wide in any::<bool>(), offset in 0u8..64) {
            let layout = LAYOUTS[layout_idx];
            let table = if wide {
                GridTranslation::for_layout(layout, PadMatrix::WIDE_4X16, fire_note).unwrap()
            } else {
                GridTranslation::for_layout(layout, PadMatrix::SQUARE_8X8, launchpad_note).unwrap()
            };
            let grid_note = GRID_BASE + offset;
            let device = table.translate_to_controller(grid_note).unwrap();
            prop_assert_eq!(table.translate_to_grid(device), Some(grid_note));
        }
    }
}
