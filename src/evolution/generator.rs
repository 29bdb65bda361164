// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Real embedding of the instantaneous generator.
//!
//! For `H = S + iK` the Schrödinger generator acting on `w = [u; v]` is
//!
//! ```text
//! A = [  K   S ]
//!     [ −S   K ]
//! ```
//!
//! which is antisymmetric when `S` is symmetric and `K` antisymmetric.

use ndarray::{s, Array1, Array2, ArrayView1};

use crate::control::ControlSet;
use crate::error::Result;
use crate::problem::SchrodingerProblem;

/// Control amplitudes of every channel at one time point.
#[derive(Debug, Clone, Default)]
pub struct ChannelValues {
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    /// Empty unless time derivatives were requested
    pub pt: Vec<f64>,
    /// Empty unless time derivatives were requested
    pub qt: Vec<f64>,
}

impl ChannelValues {
    /// Evaluate all channels at `t`.
    pub fn evaluate(
        controls: &ControlSet,
        t: f64,
        pcof: &[f64],
        with_rates: bool,
    ) -> Result<Self> {
        let mut values = Self::default();
        for c in 0..controls.len() {
            let control = controls.get(c)?;
            let coeffs = controls.slice(c, pcof)?;
            values.p.push(control.eval_p(t, coeffs));
            values.q.push(control.eval_q(t, coeffs));
            if with_rates {
                values.pt.push(control.eval_pt(t, coeffs));
                values.qt.push(control.eval_qt(t, coeffs));
            }
        }
        Ok(values)
    }
}

/// Control gradients of every channel at one time point.
#[derive(Debug, Clone, Default)]
pub struct ChannelGradients {
    pub grad_p: Vec<Vec<f64>>,
    pub grad_q: Vec<Vec<f64>>,
    /// Empty unless time derivatives were requested
    pub grad_pt: Vec<Vec<f64>>,
    /// Empty unless time derivatives were requested
    pub grad_qt: Vec<Vec<f64>>,
}

impl ChannelGradients {
    pub fn evaluate(
        controls: &ControlSet,
        t: f64,
        pcof: &[f64],
        with_rates: bool,
    ) -> Result<Self> {
        let mut grads = Self::default();
        for c in 0..controls.len() {
            let control = controls.get(c)?;
            let coeffs = controls.slice(c, pcof)?;
            grads.grad_p.push(control.eval_grad_p(t, coeffs));
            grads.grad_q.push(control.eval_grad_q(t, coeffs));
            if with_rates {
                grads.grad_pt.push(control.eval_grad_pt(t, coeffs));
                grads.grad_qt.push(control.eval_grad_qt(t, coeffs));
            }
        }
        Ok(grads)
    }
}

/// Generator `A` built from a symmetric part `S` and antisymmetric part `K`.
#[derive(Debug, Clone)]
pub struct Generator {
    s: Array2<f64>,
    k: Array2<f64>,
}

impl Generator {
    pub fn new(s: Array2<f64>, k: Array2<f64>) -> Self {
        Self { s, k }
    }

    /// `A(t)`: drift plus control-weighted couplings.
    pub fn at(problem: &SchrodingerProblem, values: &ChannelValues) -> Self {
        let mut s = problem.system_sym().clone();
        let mut k = problem.system_asym().clone();
        for (c, (sym, asym)) in problem
            .sym_operators()
            .iter()
            .zip(problem.asym_operators())
            .enumerate()
        {
            s.scaled_add(values.p[c], sym);
            k.scaled_add(values.q[c], asym);
        }
        Self { s, k }
    }

    /// `A'(t)`: couplings weighted by `pt`, `qt`. The drift is constant.
    pub fn rate(problem: &SchrodingerProblem, values: &ChannelValues) -> Self {
        let n = problem.dim();
        let mut s = Array2::zeros((n, n));
        let mut k = Array2::zeros((n, n));
        for (c, (sym, asym)) in problem
            .sym_operators()
            .iter()
            .zip(problem.asym_operators())
            .enumerate()
        {
            s.scaled_add(values.pt[c], sym);
            k.scaled_add(values.qt[c], asym);
        }
        Self { s, k }
    }

    /// Drift-only generator.
    pub fn drift(problem: &SchrodingerProblem) -> Self {
        Self::new(problem.system_sym().clone(), problem.system_asym().clone())
    }

    /// Embedded dimension 2N.
    pub fn dim(&self) -> usize {
        2 * self.s.nrows()
    }

    /// `A x`
    pub fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let n = self.s.nrows();
        let (u, v) = (x.slice(s![..n]), x.slice(s![n..]));
        stack(
            &(self.k.dot(&u) + self.s.dot(&v)),
            &(self.k.dot(&v) - self.s.dot(&u)),
        )
    }

    /// `Aᵀ x`
    pub fn apply_transpose(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let n = self.s.nrows();
        let (u, v) = (x.slice(s![..n]), x.slice(s![n..]));
        let (st, kt) = (self.s.t(), self.k.t());
        stack(&(kt.dot(&u) - st.dot(&v)), &(st.dot(&u) + kt.dot(&v)))
    }

    /// Dense `2N × 2N` matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        let n = self.s.nrows();
        let mut a = Array2::zeros((2 * n, 2 * n));
        a.slice_mut(s![..n, ..n]).assign(&self.k);
        a.slice_mut(s![..n, n..]).assign(&self.s);
        a.slice_mut(s![n.., ..n]).assign(&(-&self.s));
        a.slice_mut(s![n.., n..]).assign(&self.k);
        a
    }
}

/// `[u; v]`
pub fn stack(u: &Array1<f64>, v: &Array1<f64>) -> Array1<f64> {
    let n = u.len();
    let mut w = Array1::zeros(n + v.len());
    w.slice_mut(s![..n]).assign(u);
    w.slice_mut(s![n..]).assign(v);
    w
}

/// `⟨a, A_S b⟩` where `A_S` is the generator with `S = sym`, `K = 0`.
pub fn sym_contraction(sym: &Array2<f64>, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = sym.nrows();
    let (au, av) = (a.slice(s![..n]), a.slice(s![n..]));
    let (bu, bv) = (b.slice(s![..n]), b.slice(s![n..]));
    au.dot(&sym.dot(&bv)) - av.dot(&sym.dot(&bu))
}

/// `⟨a, A_K b⟩` where `A_K` is the generator with `S = 0`, `K = asym`.
pub fn asym_contraction(
    asym: &Array2<f64>,
    a: ArrayView1<'_, f64>,
    b: ArrayView1<'_, f64>,
) -> f64 {
    let n = asym.nrows();
    let (au, av) = (a.slice(s![..n]), a.slice(s![n..]));
    let (bu, bv) = (b.slice(s![..n]), b.slice(s![n..]));
    au.dot(&asym.dot(&bu)) + av.dot(&asym.dot(&bv))
}

/// One channel's generator, `S = p_weight·sym` and `K = q_weight·asym` with no
/// drift, applied to `x`.
pub fn channel_action(
    sym: &Array2<f64>,
    asym: &Array2<f64>,
    p_weight: f64,
    q_weight: f64,
    x: ArrayView1<'_, f64>,
) -> Array1<f64> {
    let n = sym.nrows();
    let (u, v) = (x.slice(s![..n]), x.slice(s![n..]));
    let su = sym.dot(&u) * p_weight;
    let sv = sym.dot(&v) * p_weight;
    let ku = asym.dot(&u) * q_weight;
    let kv = asym.dot(&v) * q_weight;
    stack(&(ku + sv), &(kv - su))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn sample() -> Generator {
        Generator::new(
            array![[1.0, 0.3, 0.0], [0.3, -0.5, 0.2], [0.0, 0.2, 2.0]],
            array![[0.0, 0.7, -0.1], [-0.7, 0.0, 0.4], [0.1, -0.4, 0.0]],
        )
    }

    #[test]
    fn test_apply_matches_dense() {
        let g = sample();
        let x = array![0.1, -0.2, 0.3, 0.4, 0.5, -0.6];
        let dense = g.to_dense();
        let expected = dense.dot(&x);
        let actual = g.apply(x.view());
        for (a, b) in actual.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
        let expected_t = dense.t().dot(&x);
        let actual_t = g.apply_transpose(x.view());
        for (a, b) in actual_t.iter().zip(expected_t.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_generator_is_antisymmetric() {
        let dense = sample().to_dense();
        let sum = &dense + &dense.t();
        assert!(sum.iter().all(|x| x.abs() < 1e-15));

        // ⟨x, A x⟩ = 0 keeps the norm constant
        let x = array![0.3, 0.1, -0.2, 0.7, 0.0, 0.5];
        assert!(x.dot(&sample().apply(x.view())).abs() < 1e-14);
    }

    #[test]
    fn test_contractions_match_channel_action() {
        let sym = array![[0.0, 1.0], [1.0, 0.0]];
        let asym = array![[0.0, 1.0], [-1.0, 0.0]];
        let a = array![0.2, -0.4, 0.9, 0.1];
        let b = array![0.5, 0.3, -0.7, 0.2];

        let s_action = channel_action(&sym, &asym, 1.0, 0.0, b.view());
        assert_relative_eq!(
            sym_contraction(&sym, a.view(), b.view()),
            a.dot(&s_action),
            epsilon = 1e-14
        );
        let k_action = channel_action(&sym, &asym, 0.0, 1.0, b.view());
        assert_relative_eq!(
            asym_contraction(&asym, a.view(), b.view()),
            a.dot(&k_action),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_stack() {
        assert_eq!(stack(&array![1.0], &array![2.0, 3.0]), array![1.0, 2.0, 3.0]);
    }
}
