//! Euclidean-Jordan algebra

use crate::solver::LinAlg;

/// Euclidean-Jordan algebra trait.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Inequality constraints \\(h(x) \succeq 0\\) live in a space of this kind,
/// where \\(\succeq\\) is the order induced by the cone of squares \\(\mathcal{K}\\).
pub trait JordanAlg: LinAlg
{
    /// Sets `x` to the identity element \\(e\\).
    fn id(x: &mut Self::Sl);

    /// Calculate the Jordan product \\(z = x \circ y\\).
    fn prod(x: &Self::Sl, y: &Self::Sl, z: &mut Self::Sl);

    /// Calculate \\(z = L(x)^{-1} y\\), the inverse of the Jordan product operator of \\(x\\) applied to \\(y\\).
    ///
    /// \\(x\\) shall be in the interior of \\(\mathcal{K}\\).
    fn linv(x: &Self::Sl, y: &Self::Sl, z: &mut Self::Sl);

    /// Calculate \\(z = x^{\frac12}\\).
    ///
    /// \\(x\\) shall be in \\(\mathcal{K}\\).
    fn sqrt(x: &Self::Sl, z: &mut Self::Sl);

    /// Barrier function \\(\log\det x\\).
    ///
    /// Returns negative infinity if \\(x\\) is not in the interior of \\(\mathcal{K}\\).
    fn barr(x: &Self::Sl) -> Self::F;

    /// Line search to the boundary of \\(\mathcal{K}\\).
    ///
    /// Returns the largest \\(\alpha \ge 0\\) such that \\(y + \alpha x \succeq 0\\),
    /// or positive infinity when no boundary is met along \\(x\\).
    /// When \\(y\\) is outside \\(\mathcal{K}\\) the result is the smallest \\(\alpha\\) entering it,
    /// which may be negative; with \\(x = -e\\) it is the minimum eigenvalue of \\(y\\).
    fn srch(x: &Self::Sl, y: &Self::Sl) -> Self::F;
}
