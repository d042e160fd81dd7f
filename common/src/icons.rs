use embedded_graphics::{image::ImageRaw, pixelcolor::BinaryColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconId {
    Waves,
    FlowerLeafLeft,
    FlowerTwoLeaves,
    FlowerLeafRight,
    WateringCan,
    Warning,
}

impl IconId {
    pub const ALL: [IconId; 6] = [
        IconId::Waves,
        IconId::FlowerLeafLeft,
        IconId::FlowerTwoLeaves,
        IconId::FlowerLeafRight,
        IconId::WateringCan,
        IconId::Warning,
    ];

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Waves => 1,
            Self::FlowerLeafLeft => 2,
            Self::FlowerTwoLeaves => 3,
            Self::FlowerLeafRight => 4,
            Self::WateringCan => 5,
            Self::Warning => 6,
        }
    }
}

/// 1 bpp bitmap, rows top to bottom, MSB is the leftmost pixel of each byte.
#[derive(Debug, PartialEq, Eq)]
pub struct IconGlyph {
    data: [u8; IconGlyph::LEN],
}

impl IconGlyph {
    pub const WIDTH: u32 = 40;
    pub const HEIGHT: u32 = 40;
    pub const BYTES_PER_ROW: usize = 5;
    pub const LEN: usize = Self::BYTES_PER_ROW * Self::HEIGHT as usize;

    const fn new(data: [u8; Self::LEN]) -> Self {
        Self { data }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return false;
        }
        let byte = self.data[y as usize * Self::BYTES_PER_ROW + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn as_image(&self) -> ImageRaw<'_, BinaryColor> {
        ImageRaw::new(&self.data, Self::WIDTH)
    }
}

pub fn glyph_for(icon: IconId) -> &'static IconGlyph {
    match icon {
        IconId::Waves => &WAVES,
        IconId::FlowerLeafLeft => &FLOWER_LEAF_LEFT,
        IconId::FlowerTwoLeaves => &FLOWER_TWO_LEAVES,
        IconId::FlowerLeafRight => &FLOWER_LEAF_RIGHT,
        IconId::WateringCan => &WATERING_CAN,
        IconId::Warning => &WARNING,
    }
}

#[rustfmt::skip]
static WAVES: IconGlyph = IconGlyph::new([
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x03, 0xC0, 0x00, 0x03, 0xC0,
    0x04, 0x20, 0x00, 0x04, 0x20,
    0x08, 0x10, 0x00, 0x08, 0x10,
    0x10, 0x08, 0x00, 0x10, 0x08,
    0x20, 0x04, 0x00, 0x20, 0x04,
    0x20, 0x04, 0x00, 0x20, 0x04,
    0x20, 0x06, 0x00, 0x60, 0x04,
    0x03, 0xC2, 0x00, 0x43, 0xC0,
    0x04, 0x22, 0x00, 0x44, 0x20,
    0x08, 0x11, 0x00, 0x88, 0x10,
    0x10, 0x08, 0x81, 0x10, 0x08,
    0x20, 0x04, 0x42, 0x20, 0x04,
    0x20, 0x04, 0x3C, 0x20, 0x04,
    0x20, 0x06, 0x00, 0x60, 0x04,
    0x03, 0xC2, 0x00, 0x43, 0xC0,
    0x04, 0x22, 0x00, 0x44, 0x20,
    0x08, 0x11, 0x00, 0x88, 0x10,
    0x10, 0x08, 0x81, 0x10, 0x08,
    0x20, 0x04, 0x42, 0x20, 0x04,
    0x20, 0x04, 0x3C, 0x20, 0x04,
    0x20, 0x06, 0x00, 0x60, 0x04,
    0x00, 0x02, 0x00, 0x40, 0x00,
    0x00, 0x02, 0x00, 0x40, 0x00,
    0x00, 0x01, 0x00, 0x80, 0x00,
    0x00, 0x00, 0x81, 0x00, 0x00,
    0x00, 0x00, 0x42, 0x00, 0x00,
    0x00, 0x00, 0x3C, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);

#[rustfmt::skip]
static FLOWER_LEAF_LEFT: IconGlyph = IconGlyph::new([
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x41, 0x83, 0x04, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x1E, 0x38, 0x00, 0x00,
    0x00, 0x61, 0xB8, 0x00, 0x00,
    0x00, 0x80, 0x78, 0x00, 0x00,
    0x00, 0x71, 0xB8, 0x00, 0x00,
    0x00, 0x0E, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x18, 0x00, 0x00,
    0x00, 0x00, 0x1C, 0x00, 0x00,
    0x00, 0x00, 0x0C, 0x00, 0x00,
    0x00, 0x00, 0x0E, 0x00, 0x00,
    0x00, 0x00, 0x06, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);

#[rustfmt::skip]
static FLOWER_TWO_LEAVES: IconGlyph = IconGlyph::new([
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x41, 0x83, 0x04, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x1E, 0x38, 0x00, 0x00,
    0x00, 0x61, 0xB8, 0x00, 0x00,
    0x00, 0x80, 0x78, 0xF0, 0x00,
    0x00, 0x71, 0xBB, 0x0C, 0x00,
    0x00, 0x0E, 0x3C, 0x02, 0x00,
    0x00, 0x00, 0x3B, 0x1C, 0x00,
    0x00, 0x00, 0x38, 0xE0, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x18, 0x00, 0x00,
    0x00, 0x00, 0x1C, 0x00, 0x00,
    0x00, 0x00, 0x0C, 0x00, 0x00,
    0x00, 0x00, 0x0E, 0x00, 0x00,
    0x00, 0x00, 0x06, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);

#[rustfmt::skip]
static FLOWER_LEAF_RIGHT: IconGlyph = IconGlyph::new([
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x41, 0x83, 0x04, 0x00,
    0x00, 0x41, 0xAB, 0x04, 0x00,
    0x00, 0x27, 0x01, 0xC8, 0x00,
    0x00, 0x1C, 0xBA, 0x70, 0x00,
    0x00, 0x10, 0x7C, 0x10, 0x00,
    0x00, 0x10, 0x44, 0x10, 0x00,
    0x00, 0x10, 0xC6, 0x10, 0x00,
    0x00, 0x08, 0x82, 0x20, 0x00,
    0x00, 0x07, 0x83, 0xC0, 0x00,
    0x00, 0x00, 0x44, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0xF0, 0x00,
    0x00, 0x00, 0x3B, 0x0C, 0x00,
    0x00, 0x00, 0x3C, 0x02, 0x00,
    0x00, 0x00, 0x3B, 0x1C, 0x00,
    0x00, 0x00, 0x38, 0xE0, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x38, 0x00, 0x00,
    0x00, 0x00, 0x18, 0x00, 0x00,
    0x00, 0x00, 0x1C, 0x00, 0x00,
    0x00, 0x00, 0x0C, 0x00, 0x00,
    0x00, 0x00, 0x0E, 0x00, 0x00,
    0x00, 0x00, 0x06, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);

#[rustfmt::skip]
static WATERING_CAN: IconGlyph = IconGlyph::new([
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x7F, 0xFF, 0xC0, 0x00,
    0x00, 0x7F, 0xFF, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x1F, 0x60, 0x00, 0xC0, 0x00,
    0x3F, 0xE0, 0x00, 0xC0, 0x00,
    0x3B, 0xE0, 0x00, 0xC0, 0x06,
    0x31, 0xE0, 0x00, 0xC0, 0x0E,
    0x71, 0xE0, 0x00, 0xC0, 0x1E,
    0x60, 0xE0, 0x00, 0xC0, 0x3C,
    0x60, 0xE0, 0x00, 0xC0, 0x78,
    0x60, 0xE0, 0x00, 0xC0, 0xF0,
    0x60, 0xE0, 0x00, 0xC1, 0xE0,
    0x60, 0xE0, 0x00, 0xC3, 0xC0,
    0x60, 0xE0, 0x00, 0xC7, 0x80,
    0x71, 0xE0, 0x00, 0xCF, 0x00,
    0x31, 0xE0, 0x00, 0xDE, 0x00,
    0x3B, 0xE0, 0x00, 0xFC, 0x00,
    0x3F, 0xE0, 0x00, 0xF8, 0x00,
    0x1F, 0x60, 0x00, 0xF0, 0x00,
    0x00, 0x60, 0x00, 0xE0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x60, 0x00, 0xC0, 0x00,
    0x00, 0x7F, 0xFF, 0xC0, 0x00,
    0x00, 0x7F, 0xFF, 0xC0, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]);

#[rustfmt::skip]
static WARNING: IconGlyph = IconGlyph::new([
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
]);
