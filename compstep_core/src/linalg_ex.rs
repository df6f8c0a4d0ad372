use crate::solver::LinAlg;

/// Linear algebra extended subtrait
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js"></script>
///
/// Dense matrix-vector products behind [`crate::MatOp`], one per [`crate::MatType`].
/// Each calculates \\(y \leftarrow \alpha M x + \beta y\\);
/// when \\(\beta = 0\\), `y` is overwritten without being read, so it may hold NaN on entry.
pub trait LinAlgEx: LinAlg + Clone
{
    /// General \\(M\\) of `n_row` by `n_col` in column-major `mat`,
    /// or \\(M^T\\) in its place if `transpose`.
    fn transform_ge(transpose: bool, n_row: usize, n_col: usize, alpha: Self::F, mat: &Self::Sl, x: &Self::Sl, beta: Self::F, y: &mut Self::Sl);

    /// Symmetric \\(M\\) of `n` by `n`, whose upper triangle is packed column by column in `mat`.
    fn transform_sp(n: usize, alpha: Self::F, mat: &Self::Sl, x: &Self::Sl, beta: Self::F, y: &mut Self::Sl);

    /// Diagonal \\(M = \mathbf{diag}(d)\\) with `mat` as \\(d\\).
    fn transform_di(alpha: Self::F, mat: &Self::Sl, x: &Self::Sl, beta: Self::F, y: &mut Self::Sl);
}
