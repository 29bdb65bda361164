// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trajectory error measures: relative Frobenius error against a reference
//! and Richardson extrapolation from a pair of step sizes.

use ndarray::{s, Array2};

use crate::error::{Error, Result, ValidationError};

/// Columns of `fine` that coincide with a grid of `coarse_cols` time points.
///
/// Both grids span the same interval, so `fine_cols − 1` must be a multiple
/// of `coarse_cols − 1`.
pub fn subsample(fine: &Array2<f64>, coarse_cols: usize) -> Result<Array2<f64>> {
    let fine_cols = fine.ncols();
    if coarse_cols < 2 || fine_cols < coarse_cols || (fine_cols - 1) % (coarse_cols - 1) != 0 {
        return Err(Error::Config(format!(
            "cannot subsample {} time points onto a grid of {}",
            fine_cols, coarse_cols
        )));
    }
    let stride = (fine_cols - 1) / (coarse_cols - 1);
    Ok(fine.slice(s![.., ..;stride]).to_owned())
}

/// `‖approx − reference‖_F / ‖reference‖_F`, after bringing a finer
/// reference onto the grid of `approx`.
pub fn relative_error(approx: &Array2<f64>, reference: &Array2<f64>) -> Result<f64> {
    if approx.nrows() != reference.nrows() {
        return Err(ValidationError::Dimension {
            what: "reference".into(),
            expected: format!("{} rows", approx.nrows()),
            actual: format!("{} rows", reference.nrows()),
        }
        .into());
    }
    let reference = if reference.ncols() == approx.ncols() {
        reference.clone()
    } else {
        subsample(reference, approx.ncols())?
    };
    let diff = approx - &reference;
    Ok(frobenius(&diff) / frobenius(&reference))
}

/// `(2^p·A_h − A_2h) / (2^p − 1)` on the grid of `a_2h`.
pub fn richardson_extrapolate(
    a_h: &Array2<f64>,
    a_2h: &Array2<f64>,
    order: usize,
) -> Result<Array2<f64>> {
    let a_h = coarse_view(a_h, a_2h)?;
    let factor = 2f64.powi(order as i32);
    Ok((a_h * factor - a_2h) / (factor - 1.0))
}

/// Estimated relative error of the finer solution `A_h`:
/// `‖A_extrap − A_h‖ / ‖A_extrap‖`, measured on the coarse grid.
pub fn richardson_error(a_h: &Array2<f64>, a_2h: &Array2<f64>, order: usize) -> Result<f64> {
    let extrapolated = richardson_extrapolate(a_h, a_2h, order)?;
    let a_h = coarse_view(a_h, a_2h)?;
    Ok(frobenius(&(&extrapolated - &a_h)) / frobenius(&extrapolated))
}

fn coarse_view(a_h: &Array2<f64>, a_2h: &Array2<f64>) -> Result<Array2<f64>> {
    if a_h.nrows() != a_2h.nrows() || a_h.ncols() != 2 * a_2h.ncols() - 1 {
        return Err(ValidationError::Dimension {
            what: "refined trajectory".into(),
            expected: format!("[{}, {}]", a_2h.nrows(), 2 * a_2h.ncols() - 1),
            actual: format!("[{}, {}]", a_h.nrows(), a_h.ncols()),
        }
        .into());
    }
    subsample(a_h, a_2h.ncols())
}

fn frobenius(a: &Array2<f64>) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}
