//! Mapping between screen positions and DDRAM addresses.
use crate::lcd::hd44780::{LcdError, LcdResult};

/// Size of a panel and where each of its rows starts in DDRAM.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Geometry {
    columns: u8,
    row_offsets: &'static [u8],
}

impl Geometry {
    /// 16 columns, 2 rows. Row 0 is at `0x00..=0x0F`, row 1 at `0x40..=0x4F`.
    pub const LCD1602: Geometry = Geometry { columns: 16, row_offsets: &[0x00, 0x40] };
    /// 8 columns, 2 rows.
    pub const LCD0802: Geometry = Geometry { columns: 8, row_offsets: &[0x00, 0x40] };
    /// 20 columns, 4 rows. Rows 2 and 3 continue rows 0 and 1 in DDRAM.
    pub const LCD2004: Geometry = Geometry { columns: 20, row_offsets: &[0x00, 0x40, 0x14, 0x54] };

    /// The controller addresses at most 4 rows.
    pub const MAX_ROWS: usize = 4;

    /// Creates a custom geometry. Returns `None` if there are no rows or more than
    /// [Geometry::MAX_ROWS], or if a row is longer than the 40 characters the controller has per
    /// line, or would run past the end of DDRAM.
    pub fn new(columns: u8, row_offsets: &'static [u8]) -> Option<Self> {
        let fits = (1..=Self::MAX_ROWS).contains(&row_offsets.len())
            && (1..=40).contains(&columns)
            && row_offsets.iter().all(|&offset| offset as usize + columns as usize <= 0x80);
        fits.then_some(Geometry { columns, row_offsets })
    }

    pub fn rows(&self) -> u8 {
        self.row_offsets.len() as u8
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn contains(&self, row: u8, column: u8) -> bool {
        (row as usize) < self.row_offsets.len() && column < self.columns
    }

    /// Gets the DDRAM address of a position.
    ///
    /// # Errors
    /// - `LcdError::InvalidCoordinate` if the position is outside of the panel.
    pub fn ddram_address(&self, row: u8, column: u8) -> LcdResult<u8> {
        if !self.contains(row, column) {
            return Err(LcdError::InvalidCoordinate { row, column });
        }
        Ok(self.row_offsets[row as usize] + column)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::LCD1602
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LCD1602_TABLE: [[u8; 16]; 2] = [
        [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F],
        [0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F],
    ];

    #[test]
    fn lcd1602_matches_address_table() {
        let geometry = Geometry::LCD1602;
        for row in 0..2u8 {
            for column in 0..16u8 {
                assert_eq!(
                    geometry.ddram_address(row, column).unwrap(),
                    LCD1602_TABLE[row as usize][column as usize]
                );
            }
        }
    }

    #[test]
    fn out_of_range_positions() {
        let geometry = Geometry::LCD1602;
        assert_eq!(
            geometry.ddram_address(2, 0),
            Err(LcdError::InvalidCoordinate { row: 2, column: 0 })
        );
        assert_eq!(
            geometry.ddram_address(0, 16),
            Err(LcdError::InvalidCoordinate { row: 0, column: 16 })
        );
    }

    #[test]
    fn lcd2004_interleaves_rows() {
        let geometry = Geometry::LCD2004;
        assert_eq!(geometry.rows(), 4);
        assert_eq!(geometry.ddram_address(2, 0).unwrap(), 0x14);
        assert_eq!(geometry.ddram_address(3, 19).unwrap(), 0x67);
    }

    #[test]
    fn custom_geometry_must_fit_ddram() {
        assert!(Geometry::new(40, &[0x00, 0x40]).is_some());
        assert!(Geometry::new(41, &[0x00, 0x40]).is_none());
        assert!(Geometry::new(16, &[]).is_none());
        assert!(Geometry::new(16, &[0x00, 0x78]).is_none());
    }

    #[test]
    fn custom_geometry_row_limit() {
        let four = Geometry::new(10, &[0x00, 0x40, 0x0A, 0x4A]).unwrap();
        assert_eq!(four.rows(), 4);
        assert!(Geometry::new(8, &[0x00, 0x40, 0x08, 0x48, 0x10]).is_none());
        assert!(Geometry::new(1, &[0; 256]).is_none());
    }
}
