//! Scatter chart of random samples, refreshed by a UI timer.
//!
//! Newer points are drawn more opaque. Each point's hue mixes red and blue
//! by its position: low values lean blue, high values lean red.

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use heapless::Deque;

/// Upper bound of the x axis
pub const CHART_X_MAX: u16 = 200;
/// Upper bound of the y axis
pub const CHART_Y_MAX: u16 = 1000;

const POINT_SIZE: u32 = 4;
const TICK_LEN: i32 = 4;
const X_TICKS: i32 = 5;
const Y_TICKS: i32 = 6;

const RED: Rgb888 = Rgb888::new(0xF4, 0x43, 0x36);
const BLUE: Rgb888 = Rgb888::new(0x21, 0x96, 0xF3);
const AXIS: Rgb565 = Rgb565::new(12, 24, 12);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPoint {
    pub x: u16,
    pub y: u16,
}

/// Small xorshift generator for demo data
#[derive(Debug, Clone, Copy)]
pub struct XorShift32(u32);

impl XorShift32 {
    pub const fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `min..=max`
    pub fn range(&mut self, min: u16, max: u16) -> u16 {
        let span = u32::from(max - min) + 1;
        min + (self.next_u32() % span) as u16
    }
}

/// Blend `a` over `b`; `ratio` 255 yields `a`, 0 yields `b`.
fn mix(a: Rgb888, b: Rgb888, ratio: u8) -> Rgb888 {
    let r = u32::from(ratio);
    let blend = |x: u8, y: u8| ((u32::from(x) * r + u32::from(y) * (255 - r) + 128) / 255) as u8;
    Rgb888::new(
        blend(a.r(), b.r()),
        blend(a.g(), b.g()),
        blend(a.b(), b.b()),
    )
}

pub struct ScatterChart<const N: usize> {
    area: Rectangle,
    points: Deque<ChartPoint, N>,
    rng: XorShift32,
}

impl<const N: usize> ScatterChart<N> {
    /// Chart filling `area`, pre-loaded with `N` random points.
    pub fn new(area: Rectangle, seed: u32) -> Self {
        let mut chart = Self {
            area,
            points: Deque::new(),
            rng: XorShift32::new(seed),
        };
        for _ in 0..N {
            chart.add_random();
        }
        chart
    }

    pub fn area(&self) -> Rectangle {
        self.area
    }

    /// Append a point, dropping the oldest once the chart is full.
    pub fn push(&mut self, point: ChartPoint) {
        let point = ChartPoint {
            x: point.x.min(CHART_X_MAX),
            y: point.y.min(CHART_Y_MAX),
        };
        if self.points.is_full() {
            self.points.pop_front();
        }
        self.points.push_back(point).ok();
    }

    pub fn add_random(&mut self) {
        let x = self.rng.range(0, CHART_X_MAX);
        let y = self.rng.range(0, CHART_Y_MAX);
        self.push(ChartPoint { x, y });
    }

    /// Points from oldest to newest
    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Color of a point given its drawing order (0 = oldest).
    pub fn point_color(&self, order: usize, point: &ChartPoint) -> Rgb565 {
        let count = self.points.len().max(2);
        let opacity = (255 * order.min(count - 1) / (count - 1)) as u8;

        let x_mix = u32::from(point.x) * 127 / u32::from(CHART_X_MAX);
        let y_mix = u32::from(point.y) * 127 / u32::from(CHART_Y_MAX);
        let hue = mix(RED, BLUE, (x_mix + y_mix) as u8);

        mix(hue, Rgb888::BLACK, opacity).into()
    }

    /// Top-left corner of a point's marker
    fn marker_origin(&self, point: &ChartPoint) -> Point {
        let span_x = self.area.size.width.saturating_sub(POINT_SIZE) as i32;
        let span_y = self.area.size.height.saturating_sub(POINT_SIZE) as i32;
        let dx = i32::from(point.x) * span_x / i32::from(CHART_X_MAX);
        let dy = i32::from(point.y) * span_y / i32::from(CHART_Y_MAX);
        self.area.top_left + Point::new(dx, span_y - dy)
    }

    fn draw_axes<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let style = PrimitiveStyle::with_stroke(AXIS, 1);
        let Some(bottom_right) = self.area.bottom_right() else {
            return Ok(());
        };
        let bottom_left = Point::new(self.area.top_left.x, bottom_right.y);

        Line::new(self.area.top_left, bottom_left)
            .into_styled(style)
            .draw(target)?;
        Line::new(bottom_left, bottom_right)
            .into_styled(style)
            .draw(target)?;

        let width = self.area.size.width as i32 - 1;
        let height = self.area.size.height as i32 - 1;
        for i in 0..X_TICKS {
            let x = bottom_left.x + width * i / (X_TICKS - 1);
            Line::new(
                Point::new(x, bottom_left.y),
                Point::new(x, bottom_left.y + TICK_LEN),
            )
            .into_styled(style)
            .draw(target)?;
        }
        for i in 0..Y_TICKS {
            let y = bottom_left.y - height * i / (Y_TICKS - 1);
            Line::new(
                Point::new(bottom_left.x - TICK_LEN, y),
                Point::new(bottom_left.x, y),
            )
            .into_styled(style)
            .draw(target)?;
        }
        Ok(())
    }
}

impl<const N: usize> Drawable for ScatterChart<N> {
    type Color = Rgb565;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<Self::Output, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        target.fill_solid(&self.area, Rgb565::BLACK)?;
        self.draw_axes(target)?;

        for (order, point) in self.points().enumerate() {
            let marker = Rectangle::new(
                self.marker_origin(point),
                Size::new(POINT_SIZE, POINT_SIZE),
            );
            target.fill_solid(&marker, self.point_color(order, point))?;
        }
        Ok(())
    }
}
