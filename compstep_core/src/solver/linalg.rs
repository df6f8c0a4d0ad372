//! Linear algebra

use num_traits::Float;
use crate::solver::SliceLike;

/// Linear algebra trait.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// The vector space the solvers work in.
/// Every operation shall return finite values for finite inputs;
/// the solvers treat anything else as a numerical failure.
pub trait LinAlg
{
    /// Floating point data type used as scalars.
    type F: Float;

    /// Data type of slice of `F` used as vectors.
    type Sl: SliceLike<F=Self::F> + ?Sized;

    /// Calculate 2-norm \\(\\|x\\|=\sqrt{\langle x,x \rangle}\\).
    ///
    /// Returns the calculated norm.
    /// * `x` is a vector \\(x\\).
    fn norm(x: &Self::Sl) -> Self::F
    {
        Self::inner(x, x).sqrt()
    }

    /// Calculate the inner product \\(\langle x,y \rangle\\).
    ///
    /// Returns the calculated inner product.
    /// * `x` and `y` shall have the same length.
    fn inner(x: &Self::Sl, y: &Self::Sl) -> Self::F;

    /// Copy from a vector to another vector.
    ///
    /// * `x` is a slice to copy.
    /// * `y` is a slice being copied to.
    ///   `x` and `y` shall have the same length.
    fn copy(x: &Self::Sl, y: &mut Self::Sl);

    /// Calculate \\(\alpha x\\).
    ///
    /// * `alpha` is a scalar \\(\alpha\\).
    /// * `x` is a vector \\(x\\) before entry, \\(\alpha x\\) on exit.
    fn scale(alpha: Self::F, x: &mut Self::Sl);

    /// Calculate \\(\alpha x + y\\).
    ///
    /// * `alpha` is a scalar \\(\alpha\\).
    /// * `x` is a vector \\(x\\).
    /// * `y` is a vector \\(y\\) before entry, \\(\alpha x + y\\) on exit.
    ///   `x` and `y` shall have the same length.
    fn add(alpha: Self::F, x: &Self::Sl, y: &mut Self::Sl);

    /// Sets every element of `x` to zero.
    ///
    /// Unlike scaling by zero, this also clears NaN and infinite elements.
    fn zero(x: &mut Self::Sl);
}
