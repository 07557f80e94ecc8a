/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use stlview_core::{project_scene, Camera, ProjectedTriangle, Rgb, Scene, ScreenPoint, Viewport};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Converts a scene into a grid of colored terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Rgb>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Rgb::WHITE; size],
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width as u32, self.height as u32)
    }

    /// Reallocate the buffers for a new terminal size
    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Rgb::WHITE);
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.color_buffer[y * self.width + x])
    }

    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera) {
        let wireframe = scene.mesh().is_some_and(|framed| framed.material.is_wireframe());
        for triangle in project_scene(scene, camera, self.viewport()) {
            if wireframe {
                self.render_edges(&triangle);
            } else {
                self.render_filled(&triangle);
            }
        }
    }

    fn render_filled(&mut self, triangle: &ProjectedTriangle) {
        let color = triangle.color;
        let brightness = color.r.max(color.g).max(color.b) as f32 / 255.0;

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        self.rasterize_triangle(&triangle.points, character, color);
    }

    fn render_edges(&mut self, triangle: &ProjectedTriangle) {
        let [a, b, c] = triangle.points;
        for (from, to) in [(a, b), (b, c), (c, a)] {
            self.draw_line(from, to, triangle.color);
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, character: char, color: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth <= self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    /// DDA line with interpolated depth; the glyph follows the slope
    fn draw_line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgb) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let character = if dx.abs() > 2.0 * dy.abs() {
            '-'
        } else if dy.abs() > 2.0 * dx.abs() {
            '|'
        } else if (dx > 0.0) == (dy > 0.0) {
            '\\'
        } else {
            '/'
        };

        let steps = dx.abs().max(dy.abs()).ceil().max(1.0);
        // Edges far outside the viewport are not worth walking cell by cell
        if steps > 4.0 * (self.width + self.height) as f32 {
            return;
        }
        for step in 0..=steps as usize {
            let t = step as f32 / steps;
            let x = from.x + dx * t;
            let y = from.y + dy * t;
            let depth = from.depth + (to.depth - from.depth) * t;
            self.plot(x.floor() as i32, y.floor() as i32, depth, character, color);
        }
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenPoint; 3], character: char, color: Rgb) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                        self.plot(x, y, depth, character, color);
                    }
                }
            }
        }
    }

    /// Write the buffers to `writer`, one terminal row per buffer row
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];
                let Rgb { r, g, b } = self.color_buffer[idx];

                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
