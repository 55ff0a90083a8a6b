//! Rainfall raster decoding.

use super::error::RainfallError;

/// Raw value the source uses for "no reading".
pub const NO_DATA: i64 = -99;

/// A rectangular grid of rainfall readings in millimetres.
///
/// Addressed by `(row, col)`. Missing readings are stored as `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainfallMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

impl RainfallMatrix {
    /// Decode a source body: one row per line, whitespace-separated integers.
    ///
    /// Blank lines are ignored. `-99` maps to `0`; any other negative value,
    /// non-integer token or ragged row makes the body malformed.
    ///
    /// ```
    /// use rain_router::rainfall::RainfallMatrix;
    ///
    /// let m = RainfallMatrix::parse("-99 5 -99\n1 2 3\n").unwrap();
    /// assert_eq!(m.row(0), Some(&[0, 5, 0][..]));
    /// ```
    pub fn parse(body: &str) -> Result<Self, RainfallError> {
        let mut cells = Vec::new();
        let mut cols = None;
        let mut rows = 0;

        for (line_no, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let before = cells.len();
            for token in line.split_whitespace() {
                let raw: i64 = token.parse().map_err(|_| RainfallError::Malformed {
                    line: line_no + 1,
                    reason: format!("not an integer: {token:?}"),
                })?;
                cells.push(normalize(raw).ok_or_else(|| RainfallError::Malformed {
                    line: line_no + 1,
                    reason: format!("reading out of range: {raw}"),
                })?);
            }

            let width = cells.len() - before;
            match cols {
                None => cols = Some(width),
                Some(expected) if expected != width => {
                    return Err(RainfallError::Malformed {
                        line: line_no + 1,
                        reason: format!("expected {expected} columns, found {width}"),
                    });
                }
                Some(_) => {}
            }
            rows += 1;
        }

        let Some(cols) = cols else {
            return Err(RainfallError::Malformed {
                line: 0,
                reason: "empty grid".to_string(),
            });
        };

        Ok(Self { rows, cols, cells })
    }

    /// Build a matrix from already-normalized rows.
    ///
    /// Returns `None` if there are no rows or the rows differ in length.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Option<Self> {
        let cols = rows.first()?.len();
        if cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[u32]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.cells[row * self.cols..(row + 1) * self.cols])
    }
}

fn normalize(raw: i64) -> Option<u32> {
    if raw == NO_DATA {
        return Some(0);
    }
    u32::try_from(raw).ok()
}
