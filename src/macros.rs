/// Creates a matrix containing the arguments, with the default backend.
///
/// This macro is used to create a matrix from literals, similar to the `vec!` macro
/// for vectors. There are two forms of this macro:
///
/// - Create a matrix from a list of rows:
///
/// ```
/// use mdmatrix::mat;
///
/// let a = mat![[1, 2, 3], [4, 5, 6]];
///
/// assert_eq!(a.dims(), [2, 3]);
/// assert_eq!(a.as_slice::<i32>(), Some(&[1, 2, 3, 4, 5, 6][..]));
/// ```
///
/// - Create a matrix from a given element and shape:
///
/// ```
/// use mdmatrix::mat;
///
/// let a = mat![[0.5; 3]; 2];
///
/// assert_eq!(a.dims(), [2, 3]);
/// assert_eq!(a.get_f64(1, 2), Ok(0.5));
///
/// let x = mat![[1.0]; 4];
///
/// assert_eq!(x.dims(), [4, 1]);
/// ```
///
/// All rows must have the same length, which is checked at compile time. The element
/// kind follows the element type of the literals.
#[macro_export]
macro_rules! mat {
    ($([$($x:expr),* $(,)?]),+ $(,)?) => (
        $crate::Matrix::from([$([$($x),*]),+])
    );
    ([$elem:expr; $cols:expr]; $rows:expr) => (
        $crate::Matrix::from([[$elem; $cols]; $rows])
    );
    ([$elem:expr]; $rows:expr) => (
        $crate::Matrix::from([[$elem; 1]; $rows])
    );
}
