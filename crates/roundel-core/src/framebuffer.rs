//! RAM framebuffer with dirty-region tracking.
//!
//! The UI draws into this buffer; [`FrameBuffer::flush`] then sends only the
//! bounding box of changed pixels to the panel.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Inclusive pixel bounds of the changed region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Bounds {
    fn point(x: u32, y: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x);
        self.bottom = self.bottom.max(y);
    }

    fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    fn to_rectangle(self) -> Rectangle {
        Rectangle::new(
            Point::new(self.left as i32, self.top as i32),
            Size::new(self.width(), self.height()),
        )
    }
}

/// `DrawTarget<Color = Rgb565>` backed by a heap pixel buffer.
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Rgb565>,
    dirty: Option<Bounds>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32))
    }
}

impl FrameBuffer {
    /// Black buffer of the given size. Nothing is dirty until a pixel changes.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![Rgb565::BLACK; (size.width * size.height) as usize],
            dirty: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Region the next flush would send, if any
    pub fn dirty_area(&self) -> Option<Rectangle> {
        self.dirty.map(Bounds::to_rectangle)
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        self.index(point).map(|idx| self.pixels[idx])
    }

    /// Mark the whole buffer dirty so the next flush repaints the panel.
    pub fn invalidate(&mut self) {
        if self.size.width > 0 && self.size.height > 0 {
            self.dirty = Some(Bounds {
                left: 0,
                top: 0,
                right: self.size.width - 1,
                bottom: self.size.height - 1,
            });
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (u32::try_from(point.x).ok()?, u32::try_from(point.y).ok()?);
        (x < self.size.width && y < self.size.height)
            .then(|| (y * self.size.width + x) as usize)
    }

    fn set(&mut self, point: Point, color: Rgb565) {
        let Some(idx) = self.index(point) else {
            return;
        };
        if self.pixels[idx] == color {
            return;
        }

        self.pixels[idx] = color;
        let (x, y) = (point.x as u32, point.y as u32);
        match &mut self.dirty {
            Some(bounds) => bounds.include(x, y),
            None => self.dirty = Some(Bounds::point(x, y)),
        }
    }

    /// Send the dirty region to `panel` and clear the dirty state.
    ///
    /// Returns the flushed area, or `None` if nothing changed. On error the
    /// region stays dirty so the next flush retries it.
    pub fn flush<D>(&mut self, panel: &mut D) -> Result<Option<Rectangle>, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(bounds) = self.dirty else {
            return Ok(None);
        };

        let area = bounds.to_rectangle();
        trace!(
            " Flushing {}x{} at ({}, {})",
            bounds.width(),
            bounds.height(),
            bounds.left,
            bounds.top
        );

        let stride = self.size.width as usize;
        let pixels = &self.pixels;
        let rows = (bounds.top..=bounds.bottom).flat_map(move |y| {
            let start = y as usize * stride + bounds.left as usize;
            pixels[start..start + bounds.width() as usize].iter().copied()
        });
        panel.fill_contiguous(&area, rows)?;

        self.dirty = None;
        Ok(Some(area))
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let visible = area.intersection(&self.bounding_box());
        for point in visible.points() {
            self.set(point, color);
        }
        Ok(())
    }
}
