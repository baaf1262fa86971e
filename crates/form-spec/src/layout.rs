//! Width to grid-span conversion.
//!
//! Widths are relative units (roughly 1..=100). The grid has
//! [`GRID_COLUMNS`] columns and every 25 units of width claim one column.

use std::ops::Range;

/// Column count of the layout grid.
pub const GRID_COLUMNS: u8 = 4;

const UNITS_PER_COLUMN: f64 = 25.0;

/// Span used when a descriptor declares no width.
pub const DEFAULT_SPAN: u8 = 1;

/// `ceil(width / 25)`, clamped to `1..=GRID_COLUMNS`.
///
/// Non-finite and non-positive widths map to 1; widths above 100 map to
/// [`GRID_COLUMNS`].
pub fn grid_span(width: f64) -> u8 {
    if !width.is_finite() || width <= 0.0 {
        return 1;
    }
    let span = (width / UNITS_PER_COLUMN).ceil();
    if span >= f64::from(GRID_COLUMNS) {
        GRID_COLUMNS
    } else {
        span as u8
    }
}

pub fn span_for(width: Option<f64>) -> u8 {
    width.map(grid_span).unwrap_or(DEFAULT_SPAN)
}

/// Whether a declared width sits inside the range the formula is defined on.
pub fn width_in_range(width: f64) -> bool {
    width.is_finite() && width > 0.0 && width <= 100.0
}

/// Groups consecutive spans into rows of at most `columns`, wrapping the way
/// a CSS grid would. A single span wider than the row gets a row of its own.
pub fn pack_rows(spans: &[u8], columns: u8) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut used: u16 = 0;
    for (index, span) in spans.iter().enumerate() {
        let span = u16::from(*span);
        if used > 0 && used + span > u16::from(columns) {
            rows.push(start..index);
            start = index;
            used = 0;
        }
        used += span;
    }
    if start < spans.len() {
        rows.push(start..spans.len());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_matches_divide_and_ceil() {
        assert_eq!(grid_span(1.0), 1);
        assert_eq!(grid_span(25.0), 1);
        assert_eq!(grid_span(26.0), 2);
        assert_eq!(grid_span(50.0), 2);
        assert_eq!(grid_span(75.0), 3);
        assert_eq!(grid_span(76.0), 4);
        assert_eq!(grid_span(100.0), 4);
    }

    #[test]
    fn out_of_range_widths_clamp() {
        assert_eq!(grid_span(0.0), 1);
        assert_eq!(grid_span(-30.0), 1);
        assert_eq!(grid_span(f64::NAN), 1);
        assert_eq!(grid_span(250.0), 4);
        assert_eq!(span_for(None), DEFAULT_SPAN);
    }

    #[test]
    fn rows_wrap_on_overflow() {
        let rows = pack_rows(&[2, 2, 3, 1, 4], GRID_COLUMNS);
        assert_eq!(rows, vec![0..2, 2..4, 4..5]);
        assert!(pack_rows(&[], GRID_COLUMNS).is_empty());
    }
}
