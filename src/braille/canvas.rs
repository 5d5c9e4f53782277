use crate::map::style::Rgb;

/// One terminal cell: 8 Braille dots plus the color of the last stroke
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cell {
    pub dots: u8,
    pub color: Option<Rgb>,
}

impl Cell {
    pub fn glyph(&self) -> char {
        char::from_u32(0x2800 + self.dots as u32).unwrap_or(' ')
    }
}

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// A terminal cell has one foreground color, so the last color drawn into
/// a cell wins; draw back-to-front.
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<Cell>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    /// Light the dot at braille pixel `(x, y)` and tint its cell.
    /// Dot bits per cell, indexed `[row][column]`:
    /// ```text
    /// 0x01 0x08
    /// 0x02 0x10
    /// 0x04 0x20
    /// 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }

        let cell = &mut self.cells[cy * self.width + cx];
        cell.dots |= DOT_BITS[y % 4][x % 2];
        cell.color = Some(color);
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, color: Rgb) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Cell at character position, if inside the canvas
    pub fn cell(&self, cx: usize, cy: usize) -> Option<&Cell> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        self.cells.get(cy * self.width + cx)
    }

    /// Iterate rows of cells (for line-by-line rendering)
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.width.max(1)).take(self.height)
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.rows()
            .map(|row| row.iter().map(Cell::glyph).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb(255, 0, 0);
    const BLUE: Rgb = Rgb(0, 0, 255);

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, RED);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_full_cell_and_stroke() {
        let mut canvas = BrailleCanvas::new(2, 1);
        for y in 0..4 {
            canvas.set_pixel(0, y, RED);
            canvas.set_pixel(1, y, RED);
            canvas.set_pixel(3, y, BLUE);
        }
        assert_eq!(canvas.to_string(), "⣿⢸");
        assert_eq!(canvas.cell(1, 0).unwrap().color, Some(BLUE));
    }

    #[test]
    fn test_last_color_wins() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, RED);
        canvas.set_pixel(1, 0, BLUE);
        let cell = canvas.cell(0, 0).unwrap();
        assert_eq!(cell.color, Some(BLUE));
        assert_eq!(cell.dots, 0x09);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(5, 5, RED);
        canvas.set_pixel_signed(-1, 0, RED);
        assert_eq!(canvas.to_string(), "\u{2800}");
        assert!(canvas.cell(3, 0).is_none());
    }
}
