//! Character displays
//!
//! Text is written per cell: `(line, cell)` addresses a fixed-width slot on
//! the device LCD. Characters go through a [`Charset`] before they reach the
//! wire, and each cell remembers what it last showed.

use crate::control::cache::SentCache;
use tracing::trace;

/// Maps Unicode text to a device's single-byte character set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Charset {
    /// Device-specific codes for characters outside printable ASCII
    extended: Vec<(char, u8)>,
}

/// Nearest-ASCII fallback for common accented and typographic characters
#[rustfmt::skip]
const TRANSLITERATIONS: &[(char, char)] = &[
    ('à', 'a'), ('á', 'a'), ('â', 'a'), ('ä', 'a'), ('ã', 'a'), ('å', 'a'),
    ('À', 'A'), ('Á', 'A'), ('Â', 'A'), ('Ä', 'A'), ('Ã', 'A'), ('Å', 'A'),
    ('ç', 'c'), ('Ç', 'C'),
    ('è', 'e'), ('é', 'e'), ('ê', 'e'), ('ë', 'e'),
    ('È', 'E'), ('É', 'E'), ('Ê', 'E'), ('Ë', 'E'),
    ('ì', 'i'), ('í', 'i'), ('î', 'i'), ('ï', 'i'),
    ('Ì', 'I'), ('Í', 'I'), ('Î', 'I'), ('Ï', 'I'),
    ('ñ', 'n'), ('Ñ', 'N'),
    ('ò', 'o'), ('ó', 'o'), ('ô', 'o'), ('ö', 'o'), ('õ', 'o'), ('ø', 'o'),
    ('Ò', 'O'), ('Ó', 'O'), ('Ô', 'O'), ('Ö', 'O'), ('Õ', 'O'), ('Ø', 'O'),
    ('ù', 'u'), ('ú', 'u'), ('û', 'u'), ('ü', 'u'),
    ('Ù', 'U'), ('Ú', 'U'), ('Û', 'U'), ('Ü', 'U'),
    ('ý', 'y'), ('ÿ', 'y'), ('Ý', 'Y'),
    ('ß', 's'),
    ('‘', '\''), ('’', '\''), ('“', '"'), ('”', '"'),
    ('–', '-'), ('—', '-'), ('…', '.'), ('°', 'o'),
    ('♭', 'b'), ('♯', '#'),
];

impl Charset {
    /// Plain ASCII device
    pub fn ascii() -> Self {
        Self::default()
    }

    pub fn with_extended(extended: &[(char, u8)]) -> Self {
        Self {
            extended: extended.to_vec(),
        }
    }

    /// Mackie Control LCD: arrows live where ASCII has `~` and DEL
    pub fn mackie() -> Self {
        Self::with_extended(&[('→', 0x7E), ('←', 0x7F)])
    }

    pub fn encode_char(&self, c: char) -> u8 {
        if (' '..='~').contains(&c) {
            return c as u8;
        }
        if let Some(&(_, code)) = self.extended.iter().find(|(ch, _)| *ch == c) {
            return code;
        }
        if let Some(&(_, ascii)) = TRANSLITERATIONS.iter().find(|(ch, _)| *ch == c) {
            return ascii as u8;
        }
        trace!("No display character for {:?}", c);
        b'?'
    }

    /// Encode text into exactly `width` bytes, padding with spaces
    pub fn encode_cell(&self, text: &str, width: usize) -> Vec<u8> {
        let mut out: Vec<u8> = text.chars().take(width).map(|c| self.encode_char(c)).collect();
        out.resize(width, b' ');
        out
    }
}

/// Geometry of a cell-addressed display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    pub lines: usize,
    pub cells_per_line: usize,
    pub cell_width: usize,
}

impl TextLayout {
    /// 2 x 56 LCD split into eight 7-character strips
    pub const MACKIE: TextLayout = TextLayout {
        lines: 2,
        cells_per_line: 8,
        cell_width: 7,
    };

    /// Character offset of a cell from the start of the display
    pub fn offset(&self, line: usize, cell: usize) -> usize {
        line * self.cells_per_line * self.cell_width + cell * self.cell_width
    }
}

/// Per-cell cache of what the device currently shows
#[derive(Debug, Clone)]
pub struct TextDisplay {
    layout: TextLayout,
    charset: Charset,
    cells: Vec<SentCache<Vec<u8>>>,
}

impl TextDisplay {
    pub fn new(layout: TextLayout, charset: Charset, keep_alive_ms: u64) -> Self {
        Self {
            layout,
            charset,
            cells: (0..layout.lines * layout.cells_per_line)
                .map(|_| SentCache::new(keep_alive_ms))
                .collect(),
        }
    }

    pub fn layout(&self) -> TextLayout {
        self.layout
    }

    fn slot(&self, line: usize, cell: usize) -> Option<usize> {
        (line < self.layout.lines && cell < self.layout.cells_per_line)
            .then(|| line * self.layout.cells_per_line + cell)
    }

    /// Encoded cell contents if they must be transmitted now
    pub fn prepare(&self, line: usize, cell: usize, text: &str, now_ms: u64) -> Option<Vec<u8>> {
        let Some(slot) = self.slot(line, cell) else {
            trace!("Text cell ({}, {}) outside display", line, cell);
            return None;
        };
        let encoded = self.charset.encode_cell(text, self.layout.cell_width);
        self.cells[slot]
            .needs_update(&encoded, now_ms)
            .then_some(encoded)
    }

    pub fn mark_sent(&mut self, line: usize, cell: usize, encoded: Vec<u8>, now_ms: u64) {
        if let Some(slot) = self.slot(line, cell) {
            self.cells[slot].mark_sent(encoded, now_ms);
        }
    }

    pub fn invalidate(&mut self) {
        self.cells.iter_mut().for_each(SentCache::invalidate);
    }

    pub fn set_keep_alive(&mut self, keep_alive_ms: u64) {
        for cell in &mut self.cells {
            cell.set_keep_alive(keep_alive_ms);
        }
    }
}
