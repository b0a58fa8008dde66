//! Multiplication table exercise.
//!
//! Produces the products `base * 1` through `base * 25`, laid out row by row
//! in a 5x5 grid.

use crate::error::{GameError, Result};

/// Rows and columns of the table.
pub const TABLE_SIZE: usize = 5;

/// A 5x5 grid of products.
pub type MultiplicationTable = [[f64; TABLE_SIZE]; TABLE_SIZE];

/// Builds the multiplication table for `base`.
///
/// # Examples
///
/// ```
/// use guess_game::multiplication_table;
///
/// let table = multiplication_table(2.0).unwrap();
/// assert_eq!(table[0], [2.0, 4.0, 6.0, 8.0, 10.0]);
/// assert_eq!(table[4][4], 50.0);
/// ```
pub fn multiplication_table(base: f64) -> Result<MultiplicationTable> {
    if !base.is_finite() {
        return Err(GameError::invalid_number(format!(
            "table base must be a finite number, got {base}"
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let largest = base * (TABLE_SIZE * TABLE_SIZE) as f64;
    if !largest.is_finite() {
        return Err(GameError::invalid_number(format!(
            "table base {base} is too large: products would overflow"
        )));
    }

    let mut table = [[0.0; TABLE_SIZE]; TABLE_SIZE];
    let mut factor = 1.0;
    for row in &mut table {
        for cell in row.iter_mut() {
            *cell = base * factor;
            factor += 1.0;
        }
    }
    Ok(table)
}
