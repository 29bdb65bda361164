// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Forward-mode dual numbers.
//!
//! A dual number `a + bε` with `ε² = 0` carries a value and one directional
//! derivative through arithmetic. `Dual<T>` is generic over its component type,
//! so `Dual<Dual<f64>>` carries mixed second derivatives: seed the outer
//! infinitesimal with one direction and the inner one with another and read the
//! cross term from `eps.eps`.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Scalar type controls are written against.
///
/// Implemented by `f64` and by `Dual<T>` for any `T: Real`. Mixed arithmetic
/// with plain `f64` is supported with the scalar on the right (`x * 2.0`).
pub trait Real:
    Copy
    + fmt::Debug
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Lift a plain constant (all derivative parts zero).
    fn constant(value: f64) -> Self;

    /// Primal value with every infinitesimal part dropped.
    fn value(&self) -> f64;

    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn exp(self) -> Self;
    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;

    fn zero() -> Self {
        Self::constant(0.0)
    }
}

impl Real for f64 {
    fn constant(value: f64) -> Self {
        value
    }

    fn value(&self) -> f64 {
        *self
    }

    fn sin(self) -> Self {
        f64::sin(self)
    }

    fn cos(self) -> Self {
        f64::cos(self)
    }

    fn exp(self) -> Self {
        f64::exp(self)
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
}

/// Dual number `re + eps·ε`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual<T> {
    /// Primal part
    pub re: T,
    /// Derivative part
    pub eps: T,
}

impl<T: Real> Dual<T> {
    pub fn new(re: T, eps: T) -> Self {
        Self { re, eps }
    }

    /// Independent variable: derivative part seeded with one.
    pub fn variable(re: T) -> Self {
        Self::new(re, T::constant(1.0))
    }

    /// Value with no derivative.
    pub fn lift(re: T) -> Self {
        Self::new(re, T::zero())
    }
}

impl<T: Real> Real for Dual<T> {
    fn constant(value: f64) -> Self {
        Self::lift(T::constant(value))
    }

    fn value(&self) -> f64 {
        self.re.value()
    }

    fn sin(self) -> Self {
        Self::new(self.re.sin(), self.re.cos() * self.eps)
    }

    fn cos(self) -> Self {
        Self::new(self.re.cos(), -(self.re.sin() * self.eps))
    }

    fn exp(self) -> Self {
        let e = self.re.exp();
        Self::new(e, e * self.eps)
    }

    fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        Self::new(s, self.eps / (s * 2.0))
    }

    fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::constant(1.0);
        }
        Self::new(
            self.re.powi(n),
            self.re.powi(n - 1) * self.eps * f64::from(n),
        )
    }
}

impl<T: Real> Add for Dual<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.eps + rhs.eps)
    }
}

impl<T: Real> Sub for Dual<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.eps - rhs.eps)
    }
}

impl<T: Real> Mul for Dual<T> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.re * rhs.re, self.re * rhs.eps + self.eps * rhs.re)
    }
}

impl<T: Real> Div for Dual<T> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let inv = T::constant(1.0) / rhs.re;
        Self::new(
            self.re * inv,
            (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        )
    }
}

impl<T: Real> Neg for Dual<T> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.re, -self.eps)
    }
}

impl<T: Real> Add<f64> for Dual<T> {
    type Output = Self;
    fn add(self, rhs: f64) -> Self {
        Self::new(self.re + rhs, self.eps)
    }
}

impl<T: Real> Sub<f64> for Dual<T> {
    type Output = Self;
    fn sub(self, rhs: f64) -> Self {
        Self::new(self.re - rhs, self.eps)
    }
}

impl<T: Real> Mul<f64> for Dual<T> {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.re * rhs, self.eps * rhs)
    }
}

impl<T: Real> Div<f64> for Dual<T> {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.re / rhs, self.eps / rhs)
    }
}

impl<T: Real + fmt::Display> fmt::Display for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_product_rule() {
        let x = Dual::variable(3.0);
        let y = x * x + x * 2.0;
        assert_eq!(y.re, 15.0);
        assert_eq!(y.eps, 8.0);
    }

    #[test]
    fn test_quotient_rule() {
        let x = Dual::variable(2.0);
        let y = Dual::constant(1.0) / x;
        assert_relative_eq!(y.eps, -0.25);
    }

    #[test]
    fn test_chain_rule_sin_exp() {
        let x = Dual::variable(0.7_f64);
        let y = x.sin().exp();
        assert_relative_eq!(y.eps, 0.7_f64.cos() * 0.7_f64.sin().exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_sqrt_and_powi() {
        let x = Dual::variable(4.0);
        assert_relative_eq!(x.sqrt().eps, 0.25);
        assert_relative_eq!(x.powi(3).eps, 48.0);
        assert_eq!(x.powi(0).eps, 0.0);
    }

    #[test]
    fn test_nested_second_derivative() {
        // d²/dx² sin(x) = -sin(x)
        let x0 = 0.3_f64;
        let x = Dual::new(Dual::variable(x0), Dual::constant(1.0));
        let y = x.sin();
        assert_relative_eq!(y.re.re, x0.sin(), epsilon = 1e-15);
        assert_relative_eq!(y.eps.eps, -x0.sin(), epsilon = 1e-15);
    }

    #[test]
    fn test_nested_mixed_partial() {
        // f(x, y) = x² y  =>  ∂²f/∂x∂y = 2x
        let x = Dual::new(Dual::lift(1.5), Dual::constant(1.0));
        let y = Dual::lift(Dual::variable(2.0));
        let f = x * x * y;
        assert_relative_eq!(f.eps.eps, 3.0);
        assert_eq!(f.value(), 4.5);
    }
}
