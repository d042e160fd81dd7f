use core::convert::Infallible;

use embedded_graphics::{
    image::Image,
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::{error::DisplayError, icons::IconGlyph};

pub const DISPLAY_ADDRESS: u8 = 0x3C;
pub const WIDTH: u32 = 72;
pub const HEIGHT: u32 = 40;
pub const PAGES: usize = HEIGHT as usize / 8;
pub const BUFFER_LEN: usize = WIDTH as usize * PAGES;

/// First visible controller column.
const COLUMN_OFFSET: u8 = 30;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const CLOCK_DIVIDE: u8 = 0xD5;
    pub const MULTIPLEX_RATIO: u8 = 0xA8;
    pub const DISPLAY_OFFSET: u8 = 0xD3;
    pub const START_LINE_0: u8 = 0x40;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const ADDRESSING_MODE: u8 = 0x20;
    pub const SEGMENT_REMAP_NORMAL: u8 = 0xA0;
    pub const SEGMENT_REMAP_MIRRORED: u8 = 0xA1;
    pub const COM_SCAN_NORMAL: u8 = 0xC0;
    pub const COM_SCAN_REVERSED: u8 = 0xC8;
    pub const COM_PINS: u8 = 0xDA;
    pub const CONTRAST: u8 = 0x81;
    pub const PRECHARGE: u8 = 0xD9;
    pub const VCOMH_DESELECT: u8 = 0xDB;
    pub const RESUME_FROM_RAM: u8 = 0xA4;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERT_DISPLAY: u8 = 0xA7;
    pub const PAGE_START: u8 = 0xB0;
    pub const COLUMN_LOW: u8 = 0x00;
    pub const COLUMN_HIGH: u8 = 0x10;
}

/// Scan direction of the panel. Each variant carries its own display offset;
/// the two values were calibrated separately and are not derivable from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    Flipped,
}

impl Orientation {
    pub fn from_flipped(flipped: bool) -> Self {
        if flipped {
            Self::Flipped
        } else {
            Self::Normal
        }
    }

    pub const fn segment_remap(self) -> u8 {
        match self {
            Self::Normal => cmd::SEGMENT_REMAP_NORMAL,
            Self::Flipped => cmd::SEGMENT_REMAP_MIRRORED,
        }
    }

    pub const fn com_scan(self) -> u8 {
        match self {
            Self::Normal => cmd::COM_SCAN_NORMAL,
            Self::Flipped => cmd::COM_SCAN_REVERSED,
        }
    }

    pub const fn display_offset(self) -> u8 {
        match self {
            Self::Normal => 52,
            Self::Flipped => 12,
        }
    }

    fn commands(self) -> [u8; 4] {
        [
            self.segment_remap(),
            self.com_scan(),
            cmd::DISPLAY_OFFSET,
            self.display_offset(),
        ]
    }
}

pub struct DisplayController<I2C> {
    bus: I2C,
    buffer: [u8; BUFFER_LEN],
    orientation: Orientation,
}

impl<I2C: I2c> DisplayController<I2C> {
    pub fn new(bus: I2C) -> Self {
        Self {
            bus,
            buffer: [0; BUFFER_LEN],
            orientation: Orientation::Normal,
        }
    }

    pub fn initialize(&mut self) -> Result<(), DisplayError> {
        let normal = Orientation::Normal;
        self.write_commands(&[
            cmd::DISPLAY_OFF,
            cmd::CLOCK_DIVIDE,
            0x80,
            cmd::MULTIPLEX_RATIO,
            (HEIGHT - 1) as u8,
            cmd::DISPLAY_OFFSET,
            normal.display_offset(),
            cmd::START_LINE_0,
            cmd::CHARGE_PUMP,
            0x14,
            cmd::ADDRESSING_MODE,
            0x00,
            normal.segment_remap(),
            normal.com_scan(),
            cmd::COM_PINS,
            0x12,
            cmd::CONTRAST,
            0xCF,
            cmd::PRECHARGE,
            0xF1,
            cmd::VCOMH_DESELECT,
            0x40,
            cmd::RESUME_FROM_RAM,
            cmd::NORMAL_DISPLAY,
            cmd::DISPLAY_ON,
        ])?;
        self.orientation = normal;
        self.fill(false);
        self.flush()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn release(self) -> I2C {
        self.bus
    }

    pub fn fill(&mut self, on: bool) {
        self.buffer.fill(if on { 0xFF } else { 0x00 });
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        let Some((index, mask)) = Self::locate(x, y) else {
            return;
        };
        if on {
            self.buffer[index] |= mask;
        } else {
            self.buffer[index] &= !mask;
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> bool {
        Self::locate(x, y).is_some_and(|(index, mask)| self.buffer[index] & mask != 0)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, on: bool) {
        let area = Rectangle::new(Point::new(x, y), Size::new(width, height));
        let _ = self.fill_solid(&area, BinaryColor::from(on));
    }

    pub fn rect(&mut self, x: i32, y: i32, width: u32, height: u32, on: bool) {
        let _ = Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::from(on), 1))
            .draw(self);
    }

    pub fn hline(&mut self, x: i32, y: i32, width: u32, on: bool) {
        self.fill_rect(x, y, width, 1, on);
    }

    pub fn vline(&mut self, x: i32, y: i32, height: u32, on: bool) {
        self.fill_rect(x, y, 1, height, on);
    }

    pub fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(self);
    }

    pub fn blit_glyph(&mut self, glyph: &IconGlyph, x: i32, y: i32) {
        let image = glyph.as_image();
        let _ = Image::new(&image, Point::new(x, y)).draw(self);
    }

    pub fn flush(&mut self) -> Result<(), DisplayError> {
        let mut burst = [0_u8; WIDTH as usize + 1];
        burst[0] = CONTROL_DATA;

        for page in 0..PAGES {
            self.write_commands(&[
                cmd::PAGE_START + page as u8,
                cmd::COLUMN_LOW | (COLUMN_OFFSET & 0x0F),
                cmd::COLUMN_HIGH | (COLUMN_OFFSET >> 4),
            ])?;

            let start = page * WIDTH as usize;
            burst[1..].copy_from_slice(&self.buffer[start..start + WIDTH as usize]);
            self.write(&burst)?;
        }
        Ok(())
    }

    pub fn set_orientation(&mut self, flipped: bool) -> Result<(), DisplayError> {
        let target = Orientation::from_flipped(flipped);
        if target == self.orientation {
            return Ok(());
        }

        if let Err(err) = self.write_commands(&target.commands()) {
            // Put the scan direction and offset back in step with the stored flag.
            if self.write_commands(&self.orientation.commands()).is_err() {
                warn!("display orientation restore failed after {err}");
            }
            return Err(err);
        }

        self.orientation = target;
        self.flush()
    }

    pub fn power(&mut self, on: bool) -> bool {
        self.try_commands(
            &[if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF }],
            "power",
        )
    }

    pub fn invert(&mut self, on: bool) -> bool {
        self.try_commands(
            &[if on {
                cmd::INVERT_DISPLAY
            } else {
                cmd::NORMAL_DISPLAY
            }],
            "invert",
        )
    }

    pub fn contrast(&mut self, level: u8) -> bool {
        self.try_commands(&[cmd::CONTRAST, level], "contrast")
    }

    fn try_commands(&mut self, commands: &[u8], what: &str) -> bool {
        match self.write_commands(commands) {
            Ok(()) => true,
            Err(err) => {
                warn!("display {what} command failed: {err}");
                false
            }
        }
    }

    fn write_commands(&mut self, commands: &[u8]) -> Result<(), DisplayError> {
        for command in commands {
            self.write(&[CONTROL_COMMAND, *command])?;
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.bus
            .write(DISPLAY_ADDRESS, bytes)
            .map_err(|err| DisplayError::Bus(err.kind()))
    }

    fn locate(x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some(((y / 8) * WIDTH as usize + x, 1 << (y % 8)))
    }
}

impl<I2C> OriginDimensions for DisplayController<I2C> {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl<I2C: I2c> DrawTarget for DisplayController<I2C> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.is_on());
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.is_on());
        Ok(())
    }
}
