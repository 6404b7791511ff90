//! Monochrome OLED bitmap encoding
//!
//! Frames are drawn as 128x64 RGBA and encoded into the device's bit-packed
//! layout on flush. The Fire OLED unwinds the panel into a 1024x8 strip
//! (eight 8-row bands laid side by side), remaps each 8x7 tile through a fixed
//! bit table and packs 7 bits per byte.

use crate::control::cache::SentCache;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;

/// A pixel is lit when `r + g + b` reaches this value
pub const LIT_THRESHOLD: u16 = 384;

pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [0xFF, 0xFF, 0xFF, 0xFF];
pub const BLACK: Rgba = [0x00, 0x00, 0x00, 0xFF];

/// RGBA frame buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapFrame {
    pixels: Vec<Rgba>,
}

impl BitmapFrame {
    pub fn new() -> Self {
        Self {
            pixels: vec![BLACK; WIDTH * HEIGHT],
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(BLACK);
    }

    /// Out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        if x < WIDTH && y < HEIGHT {
            self.pixels[y * WIDTH + x] = color;
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        (x < WIDTH && y < HEIGHT).then(|| self.pixels[y * WIDTH + x])
    }

    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y)
            .map(|[r, g, b, _]| r as u16 + g as u16 + b as u16 >= LIT_THRESHOLD)
            .unwrap_or(false)
    }

    /// Fill a rectangle, clipped to the frame
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgba) {
        for yy in y..(y + h).min(HEIGHT) {
            for xx in x..(x + w).min(WIDTH) {
                self.pixels[yy * WIDTH + xx] = color;
            }
        }
    }

    /// One-pixel rectangle outline
    pub fn stroke_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgba) {
        if w == 0 || h == 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }
}

impl Default for BitmapFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit remap for one 8x7 tile: `[row][column] -> bit number` (0..56)
pub type TileTable = [[u8; 7]; 8];

/// Akai Fire OLED tile table
pub const FIRE_TILE_TABLE: TileTable = [
    [13, 19, 25, 31, 37, 43, 49],
    [0, 20, 26, 32, 38, 44, 50],
    [1, 7, 27, 33, 39, 45, 51],
    [2, 8, 14, 34, 40, 46, 52],
    [3, 9, 15, 21, 41, 47, 53],
    [4, 10, 16, 22, 28, 48, 54],
    [5, 11, 17, 23, 29, 35, 55],
    [6, 12, 18, 24, 30, 36, 42],
];

/// Tiled 7-bit packing layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiledBitLayout {
    table: TileTable,
    buffer_len: usize,
}

impl TiledBitLayout {
    pub fn new(table: TileTable) -> Self {
        let mut layout = Self {
            table,
            buffer_len: 0,
        };
        let mut max_index = 0;
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                max_index = max_index.max(layout.locate(x, y).0);
            }
        }
        layout.buffer_len = max_index + 1;
        layout
    }

    pub fn fire() -> Self {
        Self::new(FIRE_TILE_TABLE)
    }

    /// Size of the packed buffer
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Byte index and bit mask for a pixel
    pub fn locate(&self, x: usize, y: usize) -> (usize, u8) {
        let xpos = x + WIDTH * (y / 8);
        let remapped = self.table[y % 8][xpos % 7] as usize;
        let index = (xpos / 7) * 8 + remapped / 7;
        (index, 1 << (remapped % 7))
    }

    pub fn encode(&self, frame: &BitmapFrame) -> Vec<u8> {
        let mut out = vec![0u8; self.buffer_len];
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                if frame.is_lit(x, y) {
                    let (index, mask) = self.locate(x, y);
                    out[index] |= mask;
                }
            }
        }
        out
    }
}

/// OLED output with change detection and keep-alive
#[derive(Debug, Clone)]
pub struct BitmapDisplay {
    layout: TiledBitLayout,
    sent: SentCache<Vec<u8>>,
}

impl BitmapDisplay {
    pub fn new(layout: TiledBitLayout, keep_alive_ms: u64) -> Self {
        Self {
            layout,
            sent: SentCache::new(keep_alive_ms),
        }
    }

    pub fn layout(&self) -> &TiledBitLayout {
        &self.layout
    }

    /// Encoded buffer if it must be transmitted now
    pub fn prepare(&self, frame: &BitmapFrame, now_ms: u64) -> Option<Vec<u8>> {
        let encoded = self.layout.encode(frame);
        self.sent.needs_update(&encoded, now_ms).then_some(encoded)
    }

    pub fn mark_sent(&mut self, encoded: Vec<u8>, now_ms: u64) {
        self.sent.mark_sent(encoded, now_ms);
    }

    pub fn invalidate(&mut self) {
        self.sent.invalidate();
    }

    pub fn set_keep_alive(&mut self, keep_alive_ms: u64) {
        self.sent.set_keep_alive(keep_alive_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<u8> {
        include_str!("fixtures/fire_oled_top_left_quadrant.hex")
            .split_whitespace()
            .map(|token| u8::from_str_radix(token, 16).unwrap())
            .collect()
    }

    #[test]
    fn test_fire_table_is_a_permutation() {
        let mut seen: Vec<u8> = FIRE_TILE_TABLE.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..56).collect::<Vec<u8>>());
    }

    #[test]
    fn test_fire_buffer_len() {
        assert_eq!(TiledBitLayout::fire().buffer_len(), 1171);
    }

    #[test]
    fn test_top_left_quadrant_matches_fixture() {
        let mut frame = BitmapFrame::new();
        frame.fill_rect(0, 0, 64, 32, WHITE);
        let encoded = TiledBitLayout::fire().encode(&frame);
        assert_eq!(encoded, fixture());
        let lit: u32 = encoded.iter().map(|b| b.count_ones()).sum();
        assert_eq!(lit, 64 * 32);
    }

    #[test]
    fn test_threshold() {
        let mut frame = BitmapFrame::new();
        frame.set_pixel(0, 0, [128, 128, 128, 255]);
        frame.set_pixel(1, 0, [128, 128, 127, 255]);
        assert!(frame.is_lit(0, 0));
        assert!(!frame.is_lit(1, 0));
        assert!(!frame.is_lit(WIDTH, 0));
    }

    #[test]
    fn test_every_pixel_has_its_own_bit() {
        let layout = TiledBitLayout::fire();
        let mut seen = std::collections::HashSet::new();
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                assert!(seen.insert(layout.locate(x, y)), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_display_sends_on_change_and_keep_alive() {
        let mut display = BitmapDisplay::new(TiledBitLayout::fire(), 3000);
        let mut frame = BitmapFrame::new();

        let first = display.prepare(&frame, 0).unwrap();
        display.mark_sent(first, 0);
        assert!(display.prepare(&frame, 100).is_none());

        frame.set_pixel(5, 5, WHITE);
        let changed = display.prepare(&frame, 200).unwrap();
        display.mark_sent(changed, 200);
        assert!(display.prepare(&frame, 3199).is_none());
        assert!(display.prepare(&frame, 3200).is_some());
    }
}
