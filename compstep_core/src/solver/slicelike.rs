use num_traits::Float;

//

/// Slice-like storage of a vector.
///
/// A vector space implementation ([`crate::solver::LinAlg`]) chooses what its vectors are;
/// the solvers only ever borrow them, split them into sub-vectors and,
/// for diagnostics, inspect their elements.
pub trait SliceLike
{
    /// Floating point data type of the elements.
    type F: Float;

    /// Borrows a raw slice as a vector.
    fn new_ref(s: &[Self::F]) -> &Self;
    /// Mutably borrows a raw slice as a vector.
    fn new_mut(s: &mut[Self::F]) -> &mut Self;

    /// Divides into the first `mid` elements and the rest.
    fn split_ref(&self, mid: usize) -> (&Self, &Self);
    /// Mutable version of [`SliceLike::split_ref`].
    fn split_mut(&mut self, mid: usize) -> (&mut Self, &mut Self);

    /// Number of elements.
    fn len(&self) -> usize;

    /// Elements as a raw slice.
    fn get_ref(&self) -> &[Self::F];
    /// Elements as a mutable raw slice.
    fn get_mut(&mut self) -> &mut[Self::F];

    fn get(&self, idx: usize) -> Self::F
    {
        self.get_ref()[idx]
    }

    fn set(&mut self, idx: usize, val: Self::F)
    {
        self.get_mut()[idx] = val;
    }

    /// Checks that no element is NaN or infinite.
    fn is_finite(&self) -> bool
    {
        self.get_ref().iter().all(|e| e.is_finite())
    }
}

/// Splits a vector into consecutive named sub-vectors.
///
/// `splitm!(work, (a; n), (b; m))` binds `a` to the first `n` elements and `b` to the next `m`.
#[macro_export]
macro_rules! splitm {
    ($slice:expr, $( ($var:ident; $len:expr) ),+ ) => {
        let (_, _splitm_rest) = $slice.split_ref(0);
        $(
            let ($var, _splitm_rest) = _splitm_rest.split_ref($len);
        )*
        let _ = _splitm_rest;
    };
}

/// Mutable version of [`splitm!`].
#[macro_export]
macro_rules! splitm_mut {
    ($slice:expr, $( ($var:ident; $len:expr) ),+ ) => {
        let (_, _splitm_rest) = $slice.split_mut(0);
        $(
            let ($var, _splitm_rest) = _splitm_rest.split_mut($len);
        )*
        let _ = _splitm_rest;
    };
}

//

impl<F: Float> SliceLike for [F]
{
    type F = F;

    fn new_ref(s: &[F]) -> &Self
    {
        s
    }

    fn new_mut(s: &mut[F]) -> &mut Self
    {
        s
    }

    fn split_ref(&self, mid: usize) -> (&Self, &Self)
    {
        self.split_at(mid)
    }

    fn split_mut(&mut self, mid: usize) -> (&mut Self, &mut Self)
    {
        self.split_at_mut(mid)
    }

    fn len(&self) -> usize
    {
        <[F]>::len(self)
    }

    fn get_ref(&self) -> &[F]
    {
        self
    }

    fn get_mut(&mut self) -> &mut[F]
    {
        self
    }
}

#[test]
fn test_splitm1()
{
    fn fill<S: SliceLike<F=f64> + ?Sized>(work: &mut S)
    {
        {
            splitm_mut!(work, (a; 2), (b; 3));
            a.set(0, 10.);
            b.set(2, 50.);
            assert_eq!(a.len(), 2);
            assert_eq!(b.len(), 3);
        }

        splitm!(work, (_a; 1), (c; 2));
        assert_eq!(c.get_ref(), &[2., 3.]);
        assert_eq!(work.get(0), 10.);
        assert_eq!(work.get(4), 50.);
    }

    let mut v = [1., 2., 3., 4., 5.];
    fill(<[f64] as SliceLike>::new_mut(&mut v));

    let w = [1., f64::NAN];
    assert!(!<[f64] as SliceLike>::new_ref(&w).is_finite());
}
