use num_traits::Zero;
use crate::solver::{SliceLike, Operator};
use crate::LinAlgEx;

//

/// Matrix type and size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatType
{
    /// General matrix with a number of rows and a number of columns.
    General(usize, usize),
    /// Symmetric matrix, supplied in packed form, with a number of rows and columns.
    SymPack(usize),
    /// Diagonal matrix, supplied as its diagonal vector, with a number of rows and columns.
    Diag(usize),
}

impl MatType
{
    /// Length of the data array of the matrix.
    pub fn len(&self) -> usize
    {
        match self {
            MatType::General(n_row, n_col) => n_row * n_col,
            MatType::SymPack(n) => n * (n + 1) / 2,
            MatType::Diag(n) => *n,
        }
    }

    /// Returns a tuple of a number of rows and a number of columns.
    pub fn size(&self) -> (usize, usize)
    {
        match self {
            MatType::General(n_row, n_col) => (*n_row, *n_col),
            MatType::SymPack(n) => (*n, *n),
            MatType::Diag(n) => (*n, *n),
        }
    }
}

//

/// Matrix operator
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Borrows a data array as a dense matrix and implements [`Operator`] on it.
/// Dense Hessians, preconditioners and Jacobians of small problems are expressed with this.
pub struct MatOp<'a, L: LinAlgEx>
{
    typ: MatType,
    array: &'a L::Sl,
}

impl<'a, L: LinAlgEx> MatOp<'a, L>
{
    /// Creates an instance over `array`, laid out as [`LinAlgEx`] expects for `typ`.
    ///
    /// Panics if the length of `array` does not fit `typ`.
    pub fn new(typ: MatType, array: &'a[L::F]) -> Self
    {
        assert_eq!(typ.len(), array.len());

        MatOp {
            typ,
            array: L::Sl::new_ref(array)
        }
    }

    fn op_impl(&self, transpose: bool, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        if self.typ.len() == 0 {
            // empty matrix, y is only scaled
            if beta == L::F::zero() {
                L::zero(y);
            }
            else {
                L::scale(beta, y);
            }
            return;
        }

        match self.typ {
            MatType::General(nr, nc) => L::transform_ge(transpose, nr, nc, alpha, self.array, x, beta, y),
            MatType::SymPack(n) => L::transform_sp(n, alpha, self.array, x, beta, y),
            MatType::Diag(_) => L::transform_di(alpha, self.array, x, beta, y),
        }
    }
}

impl<'a, L: LinAlgEx> Operator<L> for MatOp<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        self.typ.size()
    }

    fn op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        self.op_impl(false, alpha, x, beta, y);
    }

    fn trans_op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        self.op_impl(true, alpha, x, beta, y);
    }
}

impl<'a, L: LinAlgEx> AsRef<[L::F]> for MatOp<'a, L>
{
    fn as_ref(&self) -> &[L::F]
    {
        self.array.get_ref()
    }
}

//

#[test]
fn test_matop1()
{
    use float_eq::assert_float_eq;
    use crate::FloatGeneric;

    type L = FloatGeneric<f64>;

    let array = &[ // column-major, upper-triangle (seen as if transposed)
        1.,
        2.,  3.,
        4.,  5.,  6.,
        7.,  8.,  9., 10.,
       11., 12., 13., 14., 15.,
    ];
    let ref_array = &[
        1.,  2.,  4.,  7., 11.,
        2.,  3.,  5.,  8., 12.,
        4.,  5.,  6.,  9., 13.,
        7.,  8.,  9., 10., 14.,
       11., 12., 13., 14., 15.,
    ];
    let x = &mut[0.; 5];
    let y = &mut[0.; 5];

    let m = MatOp::<L>::new(MatType::SymPack(5), array);

    for i in 0.. x.len() {
        x[i] = 1.;
        m.op(1., x, 0., y);
        assert_float_eq!(y.as_ref(), ref_array[i * 5 .. i * 5 + 5].as_ref(), abs_all <= 1e-3);
        x[i] = 0.;
    }
}

#[test]
fn test_matop2()
{
    use float_eq::assert_float_eq;
    use crate::FloatGeneric;

    type L = FloatGeneric<f64>;

    let array = &[ // column-major
        1., 4.,
        2., 5.,
        3., 6.,
    ];
    let m = MatOp::<L>::new(MatType::General(2, 3), array);
    assert_eq!(m.size(), (2, 3));

    let y = &mut[1., 1.];
    m.op(1., &[1., 1., 1.], 2., y);
    assert_float_eq!(*y, [8., 17.], abs_all <= 1e-12);

    let z = &mut[0.; 3];
    m.trans_op(-1., &[1., 1.], 0., z);
    assert_float_eq!(*z, [-5., -7., -9.], abs_all <= 1e-12);

    let d = MatOp::<L>::new(MatType::Diag(2), &[2., 3.]);
    let w = &mut[f64::NAN, f64::NAN];
    d.op(1., &[1., 1.], 0., w);
    assert_float_eq!(*w, [2., 3.], abs_all <= 1e-12);
}
