//! Presentation of the tape buffer as an RGB image.
//!
//! Each program's tape is drawn as a `side x side` square of pixels
//! (`side = sqrt(tape_length)`), row-major within the square, and the
//! squares are tiled in grid order. Recognized opcodes get fixed colours,
//! everything else a dim grey proportional to the cell value.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::bff::{COMMA, DOT, GREATER, LBRACE, LBRACKET, LESS, MINUS, PLUS, RBRACE, RBRACKET};
use crate::error::{Error, Result};

/// Colour of one cell value.
pub fn cell_color(value: u32) -> [u8; 3] {
    match u8::try_from(value) {
        Ok(LESS) => [0, 64, 255],
        Ok(GREATER) => [64, 64, 255],
        Ok(LBRACE) => [0, 64, 255],
        Ok(RBRACE) => [0, 128, 255],
        Ok(PLUS) => [255, 0, 192],
        Ok(MINUS) => [192, 0, 192],
        Ok(COMMA) => [255, 0, 192],
        Ok(DOT) => [192, 64, 192],
        Ok(LBRACKET) => [0, 192, 0],
        Ok(RBRACKET) => [64, 192, 0],
        _ => {
            let grey = (value.min(1024) as u64 * 255 / 1024) as u8;
            [grey, grey, grey]
        }
    }
}

/// Side of the pixel square for a tape, if `tape_length` is a perfect square.
pub fn tape_side(tape_length: usize) -> Option<usize> {
    let side = (tape_length as f64).sqrt().round() as usize;
    (side * side == tape_length).then_some(side)
}

/// A rendered RGB frame, 3 bytes per pixel.
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Render a flat tape buffer of a `grid_width x grid_height` world.
    pub fn render(
        cells: &[u32],
        tape_length: usize,
        grid_width: usize,
        grid_height: usize,
    ) -> Result<Self> {
        let side = tape_side(tape_length).filter(|&s| s > 0).ok_or_else(|| {
            Error::Config(format!(
                "tape length {tape_length} is not a positive perfect square, cannot lay it out"
            ))
        })?;
        if cells.len() != tape_length * grid_width * grid_height {
            return Err(Error::Config(format!(
                "tape buffer has {} cells, {grid_width}x{grid_height} world of {tape_length}-cell tapes needs {}",
                cells.len(),
                tape_length * grid_width * grid_height
            )));
        }

        let width = side * grid_width;
        let height = side * grid_height;
        let mut pixels = vec![0u8; width * height * 3];
        for y in 0..height {
            for x in 0..width {
                let program = (y / side) * grid_width + x / side;
                let offset = (y % side) * side + x % side;
                let color = cell_color(cells[program * tape_length + offset]);
                let idx = (y * width + x) * 3;
                pixels[idx..idx + 3].copy_from_slice(&color);
            }
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_png(BufWriter::new(file))
    }

    pub fn write_png<W: std::io::Write>(&self, w: W) -> Result<()> {
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        Ok(())
    }
}
