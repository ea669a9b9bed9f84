//! Canvas command stream emitted by parts when an output needs repainting.
//!
//! Nothing here rasterises. A host either forwards the commands to a real
//! canvas or records them (`Vec<CanvasCmd>` implements [`Canvas`]).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Red-only LED color of the given brightness.
    pub const fn led(level: u8) -> Self {
        Rgb::new(level, 0, 0)
    }
}

/// Screen rectangle of one output, in part-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputArea {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub r: f32,
}

impl OutputArea {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        OutputArea {
            x1,
            y1,
            x2,
            y2,
            r: 0.0,
        }
    }

    pub fn with_radius(mut self, r: f32) -> Self {
        self.r = r;
        self
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Cell `index` of a row-major grid of `columns` cells of `size` pixels.
    pub fn cell(index: usize, columns: usize, size: f32) -> Self {
        let columns = columns.max(1);
        let x = (index % columns) as f32 * size;
        let y = (index / columns) as f32 * size;
        OutputArea::new(x, y, x + size, y + size).with_radius(size / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanvasCmd {
    SetColor(Rgb),
    SetFgColor(Rgb),
    SetLineWidth(u32),
    SetFontSize(u32),
    Rectangle {
        filled: bool,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Circle {
        filled: bool,
        x: f32,
        y: f32,
        radius: f32,
    },
    RotatedText {
        text: String,
        x: f32,
        y: f32,
        angle: f32,
    },
}

pub trait Canvas {
    fn command(&mut self, cmd: CanvasCmd);

    fn set_color(&mut self, color: Rgb) {
        self.command(CanvasCmd::SetColor(color));
    }

    fn set_fg_color(&mut self, color: Rgb) {
        self.command(CanvasCmd::SetFgColor(color));
    }

    fn set_line_width(&mut self, width: u32) {
        self.command(CanvasCmd::SetLineWidth(width));
    }

    fn fill_area(&mut self, area: &OutputArea) {
        self.command(CanvasCmd::Rectangle {
            filled: true,
            x: area.x1,
            y: area.y1,
            width: area.width(),
            height: area.height(),
        });
    }

    /// Vertical pin label at the bottom-left corner of `area`.
    fn pin_label(&mut self, area: &OutputArea, text: &str) {
        self.command(CanvasCmd::RotatedText {
            text: text.to_string(),
            x: area.x1,
            y: area.y2,
            angle: 90.0,
        });
    }
}

impl Canvas for Vec<CanvasCmd> {
    fn command(&mut self, cmd: CanvasCmd) {
        self.push(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let mut canvas: Vec<CanvasCmd> = Vec::new();
        let area = OutputArea::new(10.0, 20.0, 30.0, 60.0);

        canvas.set_color(Rgb::new(49, 61, 99));
        canvas.fill_area(&area);
        canvas.pin_label(&area, "RB0");

        assert_eq!(canvas.len(), 3);
        assert_eq!(canvas[0], CanvasCmd::SetColor(Rgb::new(49, 61, 99)));
        assert_eq!(
            canvas[1],
            CanvasCmd::Rectangle {
                filled: true,
                x: 10.0,
                y: 20.0,
                width: 20.0,
                height: 40.0
            }
        );
        match &canvas[2] {
            CanvasCmd::RotatedText { text, y, .. } => {
                assert_eq!(text, "RB0");
                assert_eq!(*y, 60.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_grid_cells() {
        let cell = OutputArea::cell(5, 4, 10.0);
        assert_eq!(cell.x1, 10.0);
        assert_eq!(cell.y1, 10.0);
        assert_eq!(cell.r, 5.0);
    }
}
