use super::color::ColorIndex;

/// Lit state of one control before it is encoded for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightInfo {
    pub color: ColorIndex,
    /// Alternate colour while blinking
    pub blink: Option<ColorIndex>,
    /// Fast (true) or slow blink
    pub fast: bool,
}

impl LightInfo {
    pub const OFF: LightInfo = LightInfo {
        color: ColorIndex::OFF,
        blink: None,
        fast: false,
    };

    pub fn solid(color: ColorIndex) -> Self {
        Self {
            color,
            blink: None,
            fast: false,
        }
    }

    pub fn blinking(color: ColorIndex, blink: ColorIndex, fast: bool) -> Self {
        Self {
            color,
            blink: Some(blink),
            fast,
        }
    }

    pub fn is_off(&self) -> bool {
        self.color == ColorIndex::OFF && self.blink.is_none()
    }
}
