//! LS027B7DH01 memory-LCD geometry and an in-RAM 1bpp frame.

use core::convert::Infallible;

use embedded_graphics::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::BinaryColor,
};

pub const WIDTH: usize = 400;
pub const HEIGHT: usize = 240;
pub const LINE_BYTES: usize = WIDTH / 8;
pub const FRAME_BYTES: usize = LINE_BYTES * HEIGHT;

/// Mode byte for "write lines"; OR in [`VCOM_BIT`] on alternate frames.
pub const CMD_WRITE: u8 = 0x80;
/// Mode byte for "all clear".
pub const CMD_CLEAR: u8 = 0x20;
pub const VCOM_BIT: u8 = 0x40;

/// Gate address for panel line `row` (0-based). The panel expects the
/// 1-based line number LSB first.
pub const fn line_address(row: usize) -> u8 {
    ((row + 1) as u8).reverse_bits()
}

/// Packed frame; bit 7 of each byte is the leftmost pixel and a set bit is
/// ink.
#[derive(Clone)]
pub struct FrameBuffer {
    bytes: [u8; FRAME_BYTES],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_BYTES],
        }
    }

    pub fn fill(&mut self, ink: bool) {
        self.bytes.fill(if ink { 0xFF } else { 0x00 });
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * LINE_BYTES;
        &self.bytes[start..start + LINE_BYTES]
    }

    fn put(&mut self, x: usize, y: usize, ink: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let index = y * LINE_BYTES + x / 8;
        let mask = 0x80u8 >> (x % 8);
        if ink {
            self.bytes[index] |= mask;
        } else {
            self.bytes[index] &= !mask;
        }
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) {
                self.put(x, y, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.is_on());
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}
