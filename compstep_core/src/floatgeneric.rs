use num_traits::Float;
use core::marker::PhantomData;
use crate::solver::{LinAlg, JordanAlg};
use crate::LinAlgEx;

/// `num::Float`-generic [`LinAlgEx`] and [`JordanAlg`] implementation
///
/// All numeric operations are written in pure Rust.
/// As a [`JordanAlg`], `[F]` is the nonnegative orthant with the componentwise product.
#[derive(Clone)]
pub struct FloatGeneric<F>
{
    ph_f: PhantomData<F>,
}

impl<F: Float> LinAlg for FloatGeneric<F>
{
    type F = F;
    type Sl = [F];

    fn norm(x: &[F]) -> F
    {
        let mut sum = F::zero();
        for u in x {
            sum = sum + *u * *u;
        }
        sum.sqrt()
    }

    fn inner(x: &[F], y: &[F]) -> F
    {
        assert_eq!(x.len(), y.len());

        let mut sum = F::zero();
        for (u, v) in x.iter().zip(y) {
            sum = sum + *u * *v;
        }
        sum
    }

    fn copy(x: &[F], y: &mut[F])
    {
        assert_eq!(x.len(), y.len());

        for (u, v) in x.iter().zip(y) {
            *v = *u;
        }
    }

    fn scale(alpha: F, x: &mut[F])
    {
        for u in x {
            *u = alpha * *u;
        }
    }

    fn add(alpha: F, x: &[F], y: &mut[F])
    {
        assert_eq!(x.len(), y.len());

        for (u, v) in x.iter().zip(y) {
            *v = *v + alpha * *u;
        }
    }

    fn zero(x: &mut[F])
    {
        for u in x {
            *u = F::zero();
        }
    }
}

//

impl<F: Float> JordanAlg for FloatGeneric<F>
{
    fn id(x: &mut[F])
    {
        for u in x {
            *u = F::one();
        }
    }

    fn prod(x: &[F], y: &[F], z: &mut[F])
    {
        assert_eq!(x.len(), y.len());
        assert_eq!(x.len(), z.len());

        for ((u, v), w) in x.iter().zip(y).zip(z) {
            *w = *u * *v;
        }
    }

    fn linv(x: &[F], y: &[F], z: &mut[F])
    {
        assert_eq!(x.len(), y.len());
        assert_eq!(x.len(), z.len());

        for ((u, v), w) in x.iter().zip(y).zip(z) {
            *w = *v / *u;
        }
    }

    fn sqrt(x: &[F], z: &mut[F])
    {
        assert_eq!(x.len(), z.len());

        for (u, w) in x.iter().zip(z) {
            *w = u.sqrt();
        }
    }

    fn barr(x: &[F]) -> F
    {
        let mut sum = F::zero();
        for u in x {
            if !(*u > F::zero()) {
                return F::neg_infinity();
            }
            sum = sum + u.ln();
        }
        sum
    }

    fn srch(x: &[F], y: &[F]) -> F
    {
        assert_eq!(x.len(), y.len());

        let mut alpha = F::infinity();
        for (u, v) in x.iter().zip(y) {
            if u.is_nan() || v.is_nan() {
                return F::nan();
            }
            if *u < F::zero() {
                alpha = alpha.min(-*v / *u);
            }
        }
        alpha
    }
}

//

// alpha*v + beta*y, not reading y when beta is zero
fn blend<F: Float>(alpha: F, v: F, beta: F, y: F) -> F
{
    if beta == F::zero() {alpha * v} else {alpha * v + beta * y}
}

impl<F: Float> LinAlgEx for FloatGeneric<F>
{
    fn transform_ge(transpose: bool, n_row: usize, n_col: usize, alpha: F, mat: &[F], x: &[F], beta: F, y: &mut[F])
    {
        let (ny, nx) = if transpose {(n_col, n_row)} else {(n_row, n_col)};
        assert_eq!(mat.len(), n_row * n_col);
        assert_eq!(x.len(), nx);
        assert_eq!(y.len(), ny);

        // (i, j) of the applied matrix, column-major storage
        let at = |i: usize, j: usize| if transpose {mat[i * n_row + j]} else {mat[j * n_row + i]};

        for (i, yi) in y.iter_mut().enumerate() {
            let v = x.iter().enumerate().fold(F::zero(), |acc, (j, xj)| acc + at(i, j) * *xj);
            *yi = blend(alpha, v, beta, *yi);
        }
    }

    fn transform_sp(n: usize, alpha: F, mat: &[F], x: &[F], beta: F, y: &mut[F])
    {
        assert_eq!(mat.len(), n * (n + 1) / 2);
        assert_eq!(x.len(), n);
        assert_eq!(y.len(), n);

        // upper triangle packed column by column
        let at = |i: usize, j: usize| {
            let (r, c) = (i.min(j), i.max(j));
            mat[c * (c + 1) / 2 + r]
        };

        for (i, yi) in y.iter_mut().enumerate() {
            let v = x.iter().enumerate().fold(F::zero(), |acc, (j, xj)| acc + at(i, j) * *xj);
            *yi = blend(alpha, v, beta, *yi);
        }
    }

    fn transform_di(alpha: F, mat: &[F], x: &[F], beta: F, y: &mut[F])
    {
        assert_eq!(mat.len(), x.len());
        assert_eq!(mat.len(), y.len());

        for ((yi, di), xi) in y.iter_mut().zip(mat).zip(x) {
            *yi = blend(alpha, *di * *xi, beta, *yi);
        }
    }
}

//

#[test]
fn test_srch1()
{
    use float_eq::assert_float_eq;

    type L = FloatGeneric<f64>;

    let y = &[1., 2., 0.5];

    // unbounded along a nonnegative direction
    assert!(L::srch(&[1., 0., 2.], y).is_infinite());

    let alpha = L::srch(&[-1., 1., -1.], y);
    assert_float_eq!(alpha, 0.5, abs <= 1e-12);

    // minimum eigenvalue
    let lmin = L::srch(&[-1., -1., -1.], &[3., -0.25, 1.]);
    assert_float_eq!(lmin, -0.25, abs <= 1e-12);
}

#[test]
fn test_barr1()
{
    use float_eq::assert_float_eq;

    type L = FloatGeneric<f64>;

    assert_float_eq!(L::barr(&[1., 1.]), 0., abs <= 1e-12);
    assert_float_eq!(L::barr(&[2., 0.5]), 0., abs <= 1e-12);
    assert!(L::barr(&[2., 0.]).is_infinite());
    assert!(L::barr(&[2., -1.]) < 0.);
}
