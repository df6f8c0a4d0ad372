use std::ops::{Index, IndexMut, Deref};
use num_traits::Zero;
use compstep_core::solver::SliceLike;
use compstep_core::{LinAlgEx, MatType, MatOp};

//

/// Matrix builder
///
/// Owns the data array of a matrix and lends it as [`compstep_core::MatOp`].
/// [`crate::QuadObjective`] and [`crate::LinearConstraint`] are built from it.
/// Elements are addressed by `(row, column)`; for [`MatType::SymPack`] both triangles alias the same element,
/// for [`MatType::Diag`] only the diagonal is addressable.
#[derive(Debug, Clone)]
pub struct MatBuild<L: LinAlgEx>
{
    typ: MatType,
    array: Vec<L::F>,
}

impl<L: LinAlgEx> MatBuild<L>
{
    /// Creates a zero matrix of `typ`.
    pub fn new(typ: MatType) -> Self
    {
        MatBuild {
            typ,
            array: vec![L::F::zero(); typ.len()],
        }
    }

    /// Size of the matrix.
    ///
    /// Returns a tuple of a number of rows and columns.
    pub fn size(&self) -> (usize, usize)
    {
        self.typ.size()
    }

    /// Matrix type.
    pub fn typ(&self) -> MatType
    {
        self.typ
    }

    /// Returns the [`compstep_core::MatOp`] borrowing the data array.
    pub fn as_op(&self) -> MatOp<'_, L>
    {
        MatOp::new(self.typ, &self.array)
    }

    /// Checks if the type stores a symmetric matrix.
    pub fn is_sym(&self) -> bool
    {
        matches!(self.typ, MatType::SymPack(_) | MatType::Diag(_))
    }

    /// Element at `(r, c)`, zero where the type stores nothing.
    pub fn get(&self, rc: (usize, usize)) -> L::F
    {
        self.pos(rc).map_or_else(L::F::zero, |i| self.array[i])
    }

    /// Builder pattern setting every stored element by `func(r, c)`.
    pub fn by_fn<M>(mut self, mut func: M) -> Self
    where M: FnMut(usize, usize) -> L::F
    {
        for (r, c) in self.stored() {
            self[(r, c)] = func(r, c);
        }
        self
    }

    /// Builder pattern setting the stored elements in column-major order.
    ///
    /// For [`MatType::SymPack`] the upper triangle is taken; for [`MatType::Diag`] the diagonal.
    /// Elements beyond the end of `iter` are left as they are.
    pub fn iter_colmaj<T, I>(mut self, iter: T) -> Self
    where T: IntoIterator<Item=I>, I: Deref<Target=L::F>
    {
        for ((r, c), v) in self.stored().into_iter().zip(iter) {
            self[(r, c)] = *v;
        }
        self
    }

    /// Builder pattern setting the stored elements in row-major order.
    ///
    /// For [`MatType::SymPack`] the lower triangle is taken; for [`MatType::Diag`] the diagonal.
    pub fn iter_rowmaj<T, I>(mut self, iter: T) -> Self
    where T: IntoIterator<Item=I>, I: Deref<Target=L::F>
    {
        let order: Vec<_> = match self.typ {
            MatType::General(nr, nc) => (0..nr).flat_map(|r| (0..nc).map(move |c| (r, c))).collect(),
            _ => self.stored().into_iter().map(|(r, c)| (c, r)).collect(),
        };

        for ((r, c), v) in order.into_iter().zip(iter) {
            self[(r, c)] = *v;
        }
        self
    }

    /// Builder pattern scaling every element by `alpha`.
    pub fn scale(mut self, alpha: L::F) -> Self
    {
        L::scale(alpha, L::Sl::new_mut(&mut self.array));
        self
    }

    // stored positions in the order of the data array
    fn stored(&self) -> Vec<(usize, usize)>
    {
        match self.typ {
            MatType::General(nr, nc) => (0..nc).flat_map(|c| (0..nr).map(move |r| (r, c))).collect(),
            MatType::SymPack(n) => (0..n).flat_map(|c| (0..=c).map(move |r| (r, c))).collect(),
            MatType::Diag(n) => (0..n).map(|i| (i, i)).collect(),
        }
    }

    fn pos(&self, (r, c): (usize, usize)) -> Option<usize>
    {
        let (nr, nc) = self.size();
        if r >= nr || c >= nc {
            return None;
        }

        match self.typ {
            MatType::General(nr, _) => Some(c * nr + r),
            MatType::SymPack(_) => {
                let (r, c) = (r.min(c), r.max(c));
                Some(c * (c + 1) / 2 + r)
            },
            MatType::Diag(_) => (r == c).then_some(r),
        }
    }
}

//

impl<L: LinAlgEx> Index<(usize, usize)> for MatBuild<L>
{
    type Output = L::F;
    fn index(&self, rc: (usize, usize)) -> &Self::Output
    {
        match self.pos(rc) {
            Some(i) => &self.array[i],
            None => panic!("{:?} is not stored by {:?}", rc, self.typ),
        }
    }
}

impl<L: LinAlgEx> IndexMut<(usize, usize)> for MatBuild<L>
{
    fn index_mut(&mut self, rc: (usize, usize)) -> &mut Self::Output
    {
        match self.pos(rc) {
            Some(i) => &mut self.array[i],
            None => panic!("{:?} is not stored by {:?}", rc, self.typ),
        }
    }
}

impl<L: LinAlgEx> AsRef<[L::F]> for MatBuild<L>
{
    fn as_ref(&self) -> &[L::F]
    {
        &self.array
    }
}

//

#[test]
fn test_matbuild1()
{
    use float_eq::assert_float_eq;
    use compstep_core::FloatGeneric;

    type L = FloatGeneric<f64>;

    // upper triangle of [[1, 2, 4], [2, 3, 5], [4, 5, 6]]
    let m = MatBuild::<L>::new(MatType::SymPack(3))
            .iter_colmaj(&[1., 2., 3., 4., 5., 6.]);

    assert!(m.is_sym());
    assert_eq!(m[(2, 0)], 4.);
    assert_eq!(m[(0, 2)], 4.);
    assert_float_eq!(m.as_ref(), [1., 2., 3., 4., 5., 6.].as_ref(), abs_all <= 0.);

    let r = MatBuild::<L>::new(MatType::SymPack(3))
            .iter_rowmaj(&[1., 2., 3., 4., 5., 6.]);
    assert_float_eq!(r.as_ref(), m.as_ref(), abs_all <= 0.);
}

#[test]
fn test_matbuild2()
{
    use float_eq::assert_float_eq;
    use compstep_core::FloatGeneric;

    type L = FloatGeneric<f64>;

    let m = MatBuild::<L>::new(MatType::General(2, 3))
            .iter_rowmaj(&[
                1., 2., 3.,
                4., 5., 6.,
            ])
            .scale(10.);

    assert_float_eq!(m.as_ref(), [10., 40., 20., 50., 30., 60.].as_ref(), abs_all <= 0.);
    assert!(!m.is_sym());

    let d = MatBuild::<L>::new(MatType::Diag(3))
            .by_fn(|r, _| (r + 1) as f64);

    assert_eq!(d.get((0, 2)), 0.);
    assert_eq!(d.get((3, 3)), 0.);
    assert_eq!(d[(2, 2)], 3.);
    assert_eq!(d.typ(), MatType::Diag(3));
}
