use std::env;
use std::f64::consts::E;
use std::sync::Arc;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use parking_lot::{const_mutex, Mutex};
use proptest::prelude::*;

#[cfg(feature = "serde")]
use serde_test::{assert_de_tokens_error, assert_ser_tokens, assert_tokens, Token};

use mdmatrix::{check_indices, check_linear_index, wrap_index, ALL, END};
use mdmatrix::{expm, mat, validate, Backend, Config, Dim, Error, Factory, IndexRange};
use mdmatrix::{ElementKind, Matrix, MatrixAccess, NaiveBackend, SeededRng, Shape, Validator};
use mdmatrix::{Value, DEFAULT_STREAM};

// Serializes the tests that touch the process-wide generator, factory, validation flag
// or environment.
static GLOBAL: Mutex<()> = const_mutex(());

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn square3() -> Matrix {
    mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]
}

// Backend without any operations.
#[derive(Debug)]
struct NullBackend;

impl Backend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }
}

#[test]
fn test_array() {
    let a = mdmatrix::NdArray::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();

    assert_eq!(a.kind(), ElementKind::I32);
    assert_eq!(a.rank(), 2);
    assert_eq!(a.len(), 6);
    assert_eq!(a.get(&[1, 2]), Ok(Value::I32(6)));
    assert_eq!(a.get_linear(4), Ok(Value::I32(5)));
    assert_eq!(a.get_as::<f64>(&[0, 1]), Ok(2.0));
    assert_eq!(a.sum(), Ok(Value::I64(21)));
    assert_eq!(a.mean(), Ok(3.5));
    assert_eq!(a.arg_max(), Ok(5));

    let b = a.reshape([3, 2]).unwrap();

    assert_eq!(b.dims(), [3, 2]);
    assert_eq!(b.get(&[2, 0]), Ok(Value::I32(5)));
    assert!(matches!(a.reshape([4, 2]), Err(Error::Shape(_))));

    let mut c = mdmatrix::NdArray::zeros(ElementKind::F64, [2, 2]);

    c.set(&[0, 1], 2.7).unwrap();

    assert_eq!(c.get_as::<i32>(&[0, 1]), Ok(2));
    assert!(matches!(c.to_kind(ElementKind::I8), Ok(_)));
    assert!(matches!(c.set(&[2, 0], 1.0), Err(Error::OutOfRange(_))));

    c.set(&[1, 1], 300.0).unwrap();

    assert!(matches!(c.to_kind(ElementKind::I8), Err(Error::OutOfRange(_))));
}

#[test]
fn test_all_close() {
    let a = mat![[1.0]];
    let b = mat![[1.1]];

    // The tolerance scales with the receiver only.
    assert!(!a.all_close(&b, 0.095, 0.0));
    assert!(b.all_close(&a, 0.095, 0.0));

    assert!(a.all_close(&a, 0.0, 0.0));
    assert!(!a.all_close(&mat![[1.0, 1.0]], 1.0, 1.0));
}

#[test]
fn test_backend() {
    let a = mat![[4.0, 1.0], [2.0, 3.0]];
    let b = mat![[1.0], [2.0]];

    let x = a.solve(&b).unwrap();

    assert_eq!(x.dims(), [2, 1]);
    assert_abs_diff_eq!(x.get_f64(0, 0).unwrap(), 0.1, epsilon = 1e-15);
    assert_abs_diff_eq!(x.get_f64(1, 0).unwrap(), 0.6, epsilon = 1e-15);

    assert_eq!(a.det(), Ok(10.0));
    assert!((&a * &a.inverse().unwrap()).all_close(&mdmatrix::eye(2), 0.0, 1e-14));

    let singular = mat![[1.0, 2.0], [2.0, 4.0]];

    assert_eq!(singular.solve(&b), Err(Error::Singular));
    assert_eq!(singular.inverse(), Err(Error::Singular));
    assert_eq!(singular.det(), Ok(0.0));

    let l = mat![[4.0, 2.0], [2.0, 3.0]].chol().unwrap();

    assert!(l.all_close(&mat![[2.0, 0.0], [1.0, 2f64.sqrt()]], 1e-15, 0.0));
    assert_eq!(mat![[1.0, 2.0], [2.0, 1.0]].chol(), Err(Error::NotPositiveDefinite));

    let c = mat![[0.0, 1.0], [2.0, 3.0]];
    let lu = c.lu().unwrap();

    assert_eq!(lu.perm, [1, 0]);
    assert_eq!(&lu.l * &lu.u, mat![[2.0, 3.0], [0.0, 1.0]]);

    let err = c.qr().unwrap_err();

    assert_eq!(err, Error::UnsupportedByBackend { backend: "naive".to_string(), op: "qr" });
    assert_eq!(err.to_string(), "operation `qr` is not supported by the naive backend");
    assert!(matches!(c.svd(), Err(Error::UnsupportedByBackend { op: "svd", .. })));
    assert!(matches!(c.pinv(), Err(Error::UnsupportedByBackend { op: "pinv", .. })));

    assert!(matches!(a.matmul(&mat![[1.0, 2.0, 3.0]]), Err(Error::Shape(_))));
    assert!(matches!(mat![[1.0, 2.0]].det(), Err(Error::Shape(_))));
}

#[test]
fn test_custom_backend() {
    let factory = Factory::new(Config::default(), Arc::new(NullBackend));
    let a = factory.eye(2);

    assert_eq!(a.backend().name(), "null");
    assert_eq!(a.transpose().backend().name(), "null");
    assert_eq!(a.add(&a).unwrap().backend().name(), "null");

    let err = Error::UnsupportedByBackend { backend: "null".to_string(), op: "matmul" };

    assert_eq!(a.matmul(&a), Err(err.clone()));
    assert_eq!(a.pow(2), Err(err.clone()));
    assert_eq!(expm(&a), Err(err));
    assert!(matches!(a.det(), Err(Error::UnsupportedByBackend { op: "det", .. })));

    let b = a.with_backend(Arc::new(NaiveBackend));

    assert_eq!(b.pow(2), Ok(b.clone()));
}

#[test]
fn test_config() {
    let _guard = GLOBAL.lock();

    env::set_var(mdmatrix::SEED_VAR, "11");
    env::set_var(mdmatrix::VALIDATE_VAR, "off");
    env::remove_var(mdmatrix::STREAM_VAR);

    let config = Config::from_env().unwrap();

    assert_eq!(config, Config::new().with_seed(11).with_validate(false));
    assert_eq!(config.stream, DEFAULT_STREAM);

    env::set_var(mdmatrix::VALIDATE_VAR, "maybe");

    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    env::remove_var(mdmatrix::SEED_VAR);
    env::remove_var(mdmatrix::VALIDATE_VAR);

    assert_eq!(Config::from_env(), Ok(Config::default()));
}

#[test]
fn test_default_factory() {
    init();

    let _guard = GLOBAL.lock();

    let config = Config::new().with_seed(3).with_validate(false);

    mdmatrix::set_default_factory(Factory::new(config.clone(), Arc::new(NaiveBackend)));

    assert_eq!(mdmatrix::default_factory().config(), &config);
    assert!(!mdmatrix::validation_enabled());

    let expected = Factory::default().rand_with(&mut SeededRng::new(3, DEFAULT_STREAM), 1, 3);

    assert_eq!(mdmatrix::rand(1, 3), expected);

    let a = mdmatrix::zeros(2, 3);

    let result = validate(|v| {
        v.require("a", &a, 5, 5);
    });

    assert_eq!(result, Ok(()));

    mdmatrix::reset_default_factory();

    assert!(mdmatrix::validation_enabled());
    assert_eq!(mdmatrix::default_factory().config(), &Config::default());

    let result = validate(|v| {
        v.require("a", &a, 5, 5);
    });

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_expm() {
    init();

    let e1 = expm(&mdmatrix::eye(3)).unwrap();

    assert!(e1.all_close(&(&mdmatrix::eye(3) * E), 1e-13, 1e-13));

    let e3 = expm(&(&mdmatrix::eye(3) * 3.0)).unwrap();

    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 20.085536923187668 } else { 0.0 };

            assert_abs_diff_eq!(e3.get_f64(i, j).unwrap(), expected, epsilon = 1e-9);
        }
    }

    let nilpotent = expm(&mat![[0.0, 1.0], [0.0, 0.0]]).unwrap();

    assert!(nilpotent.all_close(&mat![[1.0, 1.0], [0.0, 1.0]], 1e-14, 1e-14));

    let rotation = expm(&mat![[0.0, -1.0], [1.0, 0.0]]).unwrap();
    let (c, s) = (1f64.cos(), 1f64.sin());

    assert!(rotation.all_close(&mat![[c, -s], [s, c]], 1e-13, 1e-13));

    // Large norm, which needs scaling and squaring.
    let scaled = expm(&mat![[10.0, 0.0], [0.0, -2.0]]).unwrap();

    assert_relative_eq!(scaled.get_f64(0, 0).unwrap(), 10f64.exp(), max_relative = 1e-12);
    assert_relative_eq!(scaled.get_f64(1, 1).unwrap(), (-2f64).exp(), max_relative = 1e-12);
    assert_abs_diff_eq!(scaled.get_f64(0, 1).unwrap(), 0.0, epsilon = 1e-12);

    let integer = expm(&mat![[0, 0], [0, 0]]).unwrap();

    assert_eq!(integer.kind(), ElementKind::F64);
    assert_eq!(integer, mdmatrix::eye(2));

    assert!(matches!(expm(&mat![[1.0, 2.0]]), Err(Error::Shape(_))));
    assert_eq!(expm(&mat![[f64::INFINITY]]), Err(Error::NotFinite("expm")));
    assert_eq!(expm(&mat![[f64::NAN, 1.0], [0.0, 1.0]]), Err(Error::NotFinite("expm")));
}

#[test]
fn test_factory() {
    let factory = Factory::default();

    assert_eq!(factory.backend().name(), "naive");
    assert_eq!(factory.zeros(2, 3).to_vec_f64(), Ok(vec![0.0; 6]));
    assert_eq!(factory.ones(1, 2).to_vec_f64(), Ok(vec![1.0; 2]));
    assert_eq!(factory.eye(2).to_vec_f64(), Ok(vec![1.0, 0.0, 0.0, 1.0]));
    assert_eq!(factory.fill(2, 1, 2.5).to_vec_f64(), Ok(vec![2.5; 2]));
    assert_eq!(factory.zeros_kind(ElementKind::I16, 1, 1).kind(), ElementKind::I16);

    let a = factory.from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();

    assert_eq!(a, factory.create(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap());
    assert_eq!(factory.from_rows::<Vec<f64>>(&[]).unwrap().dims(), [0, 0]);
    assert!(matches!(factory.from_rows(&[vec![1.0], vec![2.0, 3.0]]), Err(Error::Shape(_))));
    assert!(matches!(factory.create(2, 2, vec![1.0]), Err(Error::Shape(_))));

    let r = factory.arange(0.0, 1.0, 0.25).unwrap();

    assert_eq!(r.to_vec_f64(), Ok(vec![0.0, 0.25, 0.5, 0.75]));
    assert_eq!(factory.arange(3.0, 0.0, -1.0).unwrap().to_vec_f64(), Ok(vec![3.0, 2.0, 1.0]));
    assert_eq!(factory.arange(1.0, 0.0, 1.0).unwrap().dims(), [1, 0]);
    assert!(matches!(factory.arange(0.0, 1.0, 0.0), Err(Error::OutOfRange(_))));

    let u = factory.rand_with(&mut SeededRng::new(5, 1), 20, 20);

    assert!(u.to_vec_f64().unwrap().iter().all(|&x| (0.0..1.0).contains(&x)));
}

#[test]
fn test_index() {
    assert_eq!(wrap_index(-1, 5), Ok(4));
    assert_eq!(wrap_index(4, 5), Ok(4));
    assert!(matches!(wrap_index(5, 5), Err(Error::OutOfRange(_))));
    assert!(matches!(wrap_index(-6, 5), Err(Error::OutOfRange(_))));

    let shape = Shape::from([2, 3]);

    assert_eq!(check_indices(&[1, 2], &shape), Ok(()));
    assert_eq!(
        check_indices(&[1, 3], &shape),
        Err(Error::OutOfRange("index [1, 3] is out of bounds for array of shape [2, 3]".into()))
    );
    assert!(matches!(check_indices(&[1], &shape), Err(Error::Shape(_))));

    assert_eq!(
        check_linear_index(6, &shape),
        Err(Error::OutOfRange(
            "linear index 6 is out of bounds for array of 6 elements with shape [2, 3]".into()
        ))
    );
    assert_eq!(
        check_linear_index(1, &Shape::from([1, 1])),
        Err(Error::OutOfRange(
            "linear index 1 is out of bounds for array of 1 element with shape [1, 1]".into()
        ))
    );

    assert_eq!(IndexRange::new(0, END).wrap(3), Ok(0..3));
    assert_eq!(IndexRange::new(1, -2).wrap(3), Ok(1..2));
    assert_eq!(ALL.wrap(0), Ok(0..0));
    assert!(matches!(IndexRange::new(2, 0).wrap(3), Err(Error::OutOfRange(_))));
}

#[test]
fn test_macros() {
    assert_eq!(mat![[1, 2], [3, 4]], Matrix::from([[1, 2], [3, 4]]));
    assert_eq!(mat![[1.0, 2.0, 3.0,],], Matrix::from([[1.0, 2.0, 3.0]]));
    assert_eq!(mat![[0.0; 3]; 2], mdmatrix::zeros(2, 3));

    assert_eq!(mat![[1i8, 2]].kind(), ElementKind::I8);
    assert_eq!(mat![[7; 2]; 3].dims(), [3, 2]);
    assert_eq!(mat![[0.5]; 4], mdmatrix::fill(4, 1, 0.5));
}

#[test]
fn test_matrix() {
    let a = square3();

    assert_eq!(a.shape(), (3, 3));
    assert_eq!(a.trace(), Ok(15.0));
    assert_eq!(a.norm1(), Ok(18.0));
    assert!(mat![[f64::NAN, 1.0], [0.0, 1.0]].norm1().unwrap().is_nan());
    assert_eq!(a.get(2, 1), Ok(Value::F64(8.0)));
    assert_eq!(a.transpose().row(0).unwrap(), mat![[1.0, 4.0, 7.0]]);
    assert_eq!(a.diag(), mat![[1.0], [5.0], [9.0]]);
    assert_eq!(a.col(END).unwrap(), mat![[3.0], [6.0], [9.0]]);

    assert_eq!(a.slice(0..=END, 1..=END).unwrap(), mat![[2.0, 3.0], [5.0, 6.0], [8.0, 9.0]]);
    assert_eq!(a.slice(-2..=-2, ..).unwrap(), mat![[4.0, 5.0, 6.0]]);
    assert!(matches!(a.slice(0..=3, ALL), Err(Error::OutOfRange(_))));

    let mut b = a.clone();

    b.assign(0..=1, 0..=1, &mat![[0.0, 0.0], [0.0, 0.0]]).unwrap();
    b.fill(END, ALL, -1.0).unwrap();
    b.set_col(1, &mat![[10.0], [20.0], [30.0]]).unwrap();

    assert_eq!(b, mat![[0.0, 10.0, 3.0], [0.0, 20.0, 6.0], [-1.0, 30.0, -1.0]]);
    assert!(matches!(b.assign(0..=1, ALL, &mat![[1.0]]), Err(Error::Shape(_))));

    let left = a.slice(ALL, 0).unwrap();
    let right = a.slice(ALL, 1..=END).unwrap();
    let top = a.slice(0, ALL).unwrap();
    let bottom = a.slice(1..=END, ALL).unwrap();

    assert_eq!(Matrix::hstack(&[&left, &right]).unwrap(), a);
    assert_eq!(Matrix::vstack(&[&top, &bottom]).unwrap(), a);
    assert!(matches!(Matrix::hstack(&[&top, &left]), Err(Error::Shape(_))));
    assert!(matches!(Matrix::vstack(&[]), Err(Error::Shape(_))));

    let mixed = Matrix::hstack(&[&mat![[1], [2]], &mat![[2.7], [3.5]]]).unwrap();

    assert_eq!(mixed.kind(), ElementKind::F64);
    assert_eq!(mixed, mat![[1.0, 2.7], [2.0, 3.5]]);
    assert_eq!(Matrix::vstack(&[&mat![[1, 2]], &mat![[3, 4]]]).unwrap(), mat![[1, 2], [3, 4]]);

    let sums = mat![[1.0, 2.0, 3.0, 4.0, 1.0]].cum_sum().unwrap();

    assert_eq!(sums, mat![[1.0, 3.0, 6.0, 10.0, 11.0]]);
    assert_eq!(
        sums.slice(0, 1..=END).unwrap().sub(&sums.slice(0, 0..=-2).unwrap()),
        Ok(mat![[2.0, 3.0, 4.0, 1.0]])
    );
    assert_eq!(mat![[1, 2], [3, 4]].cum_sum().unwrap(), mat![[1.0, 3.0, 6.0, 10.0]]);

    let shear = mat![[1.0, 1.0], [0.0, 1.0]];

    assert_eq!(shear.pow(0), Ok(mdmatrix::eye(2)));
    assert_eq!(shear.pow(3), Ok(mat![[1.0, 3.0], [0.0, 1.0]]));
    assert!(matches!(shear.pow(-1), Err(Error::OutOfRange(_))));
    assert!(matches!(left.pow(2), Err(Error::Shape(_))));

    assert_eq!(a.max_abs_diff(&a.transpose()), Ok(4.0));
    assert_eq!(a.to_kind(ElementKind::I32).unwrap().as_slice::<i32>().map(|s| s[4]), Some(5));
}

#[test]
fn test_ops() {
    let a = mat![[1.0, 2.0], [3.0, 4.0]];
    let b = mat![[5.0, 6.0], [7.0, 8.0]];

    assert_eq!(&a + &b, mat![[6.0, 8.0], [10.0, 12.0]]);
    assert_eq!(&b - &a, mat![[4.0, 4.0], [4.0, 4.0]]);
    assert_eq!(&a * &b, mat![[19.0, 22.0], [43.0, 50.0]]);
    assert_eq!(&a * 2.0, mat![[2.0, 4.0], [6.0, 8.0]]);
    assert_eq!(&a / 2.0, mat![[0.5, 1.0], [1.5, 2.0]]);
    assert_eq!(-&a, mat![[-1.0, -2.0], [-3.0, -4.0]]);
    assert_eq!(a.mul_elem(&b), Ok(mat![[5.0, 12.0], [21.0, 32.0]]));
    assert_eq!(a.pow_elem(2.0), Ok(mat![[1.0, 4.0], [9.0, 16.0]]));

    let i = mat![[1, 2], [3, 4]];

    assert_eq!(i.add(&i), Ok(mat![[2, 4], [6, 8]]));
    assert_eq!(i.div_scalar(2.0), Ok(mat![[0, 1], [1, 2]]));
    assert!(matches!(i.add(&a), Err(Error::ElementKind { op: "add", .. })));
    assert!(matches!(a.add(&mat![[1.0]]), Err(Error::Shape(_))));

    let x: mdmatrix::Object = Arc::new("x");
    let y: mdmatrix::Object = Arc::new(2);
    let objects = mdmatrix::NdArray::from_objects([1, 2], vec![x, y]).unwrap();

    assert_eq!(objects.sum(), Err(Error::ElementKind { op: "sum", found: ElementKind::Object }));
    assert!(matches!(objects.neg(), Err(Error::ElementKind { op: "neg", .. })));
}

#[test]
#[should_panic(expected = "matmul requires inner dimensions to agree")]
fn test_ops_panic() {
    let _ = &mat![[1.0, 2.0]] * &mat![[1.0, 2.0]];
}

#[test]
fn test_random() {
    let _guard = GLOBAL.lock();

    let mut r1 = SeededRng::new(7, DEFAULT_STREAM);
    let mut r2 = SeededRng::new(7, DEFAULT_STREAM);

    for _ in 0..100 {
        assert_eq!(r1.next_f64(), r2.next_f64());
        assert_eq!(r1.next_gaussian(), r2.next_gaussian());
    }

    r1.set_seed(7);
    r2 = SeededRng::new(7, DEFAULT_STREAM);

    assert_eq!(r1.next_u64(), r2.next_u64());
    assert_eq!(r1.next_gaussian(), r2.next_gaussian());

    mdmatrix::reset_default_factory();
    mdmatrix::set_seed(7);

    let a = mdmatrix::rand(3, 3);

    mdmatrix::set_seed(7);

    assert_eq!(mdmatrix::rand(3, 3), a);
    assert_eq!(Factory::default().rand_with(&mut SeededRng::new(7, DEFAULT_STREAM), 3, 3), a);

    let factory = Factory::default();
    let x = factory.randn_with(&mut SeededRng::new(1, DEFAULT_STREAM), 30, 30);
    let y = factory.randn_with(&mut SeededRng::new(2, DEFAULT_STREAM), 30, 30);

    assert!(!x.all_close(&y, 1e-3, 1e-3));

    let mean = x.mean().unwrap();
    let var = x.map_f64(|v| (v - mean) * (v - mean)).unwrap().mean().unwrap();

    assert!(mean.abs() < 0.2);
    assert!((var - 1.0).abs() < 0.2);

    mdmatrix::reset_default_rng();
}

#[cfg(feature = "serde")]
#[test]
fn test_serde() {
    assert_tokens(
        &mat![[1.0, 2.0], [3.0, 4.0]],
        &[
            Token::Seq { len: Some(2) },
            Token::Seq { len: Some(2) },
            Token::F64(1.0),
            Token::F64(2.0),
            Token::SeqEnd,
            Token::Seq { len: Some(2) },
            Token::F64(3.0),
            Token::F64(4.0),
            Token::SeqEnd,
            Token::SeqEnd,
        ],
    );

    assert_ser_tokens(
        &mat![[4, 5, 6]],
        &[
            Token::Seq { len: Some(1) },
            Token::Seq { len: Some(3) },
            Token::I32(4),
            Token::I32(5),
            Token::I32(6),
            Token::SeqEnd,
            Token::SeqEnd,
        ],
    );

    assert_tokens(
        &Config::new().with_seed(7),
        &[
            Token::Struct { name: "Config", len: 3 },
            Token::Str("seed"),
            Token::U64(7),
            Token::Str("stream"),
            Token::U64(DEFAULT_STREAM),
            Token::Str("validate"),
            Token::Bool(true),
            Token::StructEnd,
        ],
    );

    assert_de_tokens_error::<Matrix>(
        &[
            Token::Seq { len: Some(2) },
            Token::Seq { len: Some(2) },
            Token::F64(1.0),
            Token::F64(2.0),
            Token::SeqEnd,
            Token::Seq { len: Some(3) },
            Token::F64(3.0),
            Token::F64(4.0),
            Token::F64(5.0),
            Token::SeqEnd,
        ],
        "invalid dimensions [3], expected [2]",
    );
}

#[test]
fn test_validate() {
    let x = mat![[1.0, 2.0, 3.0]];
    let y = mat![[1.0], [2.0], [3.0], [4.0]];
    let mut v = Validator::with_enabled(true);

    v.require("x", &x, 1, 'N');
    v.require("y", &y, 'N', 1);

    assert_eq!(
        v.finish().unwrap_err().to_string(),
        "invalid matrix dimensions:\n  \
         x is 1 by 3 but must be a N-vector; N is shared with y\n  \
         y is 4 by 1 but must be a N-vector; N is shared with x"
    );

    let a = mat![[0.0; 3]; 2];
    let b = mat![[0.0; 5]; 4];
    let mut v = Validator::with_enabled(true);

    v.require("a", &a, 'M', 'N');
    v.require("b", &b, 'M', 'N').transposable();

    let msg = v.finish().unwrap_err().to_string();

    assert!(msg.contains("a is 2 by 3 but must be M by N; M is shared with b; N is shared with b"));
    assert!(msg.contains("b is 4 by 5 but must be M by N or its transpose"));

    let s = mat![[2.0, 1.0], [1.0, 3.0]];
    let t = mat![[2.0, 1.0], [0.0, 3.0]];
    let mut v = Validator::with_enabled(true);

    v.require("s", &s, 'N', 'N').symmetric();
    v.require("x", &x, Dim::Var('N'), Dim::Size(1)).transposable();

    assert!(matches!(v.finish(), Err(Error::Validation(_))));

    let mut v = Validator::with_enabled(true);

    v.require("s", &s, 'N', 'N').symmetric();
    v.require("t", &t, 'N', 'N').symmetric();
    v.require("z", &x, 1, 'K');

    assert_eq!(
        v.finish(),
        Err(Error::Validation("invalid matrix dimensions:\n  t must be symmetric".into()))
    );

    let a = mat![[0.0; 5]; 3];
    let b = mat![[0.0]; 4];
    let mut v = Validator::with_enabled(true);

    v.require("a", &a, 2, 'N');
    v.require("b", &b, 'N', 1);

    assert_eq!(
        v.finish().unwrap_err().to_string(),
        "invalid matrix dimensions:\n  \
         a is 3 by 5 but must be 2 by N; N is shared with b\n  \
         b is 4 by 1 but must be a N-vector; N is shared with a"
    );

    let w = square3();
    let view = w.view(0..=1, ALL).unwrap();
    let mut v = Validator::with_enabled(true);

    v.require("view", &view, 2, 'K');
    v.require("w", &w, 'K', 'K');

    assert_eq!(v.finish(), Ok(()));
}

#[test]
fn test_validate_global() {
    let _guard = GLOBAL.lock();

    let a = mat![[1.0, 2.0]];

    assert!(Validator::new().is_enabled());

    let result = validate(|v| {
        v.require("a", &a, 2, 1);
    });

    assert!(result.is_err());

    mdmatrix::set_validation_enabled(false);

    assert!(!Validator::new().is_enabled());

    let result = validate(|v| {
        v.require("a", &a, 2, 1);
    });

    assert_eq!(result, Ok(()));

    mdmatrix::set_validation_enabled(true);

    let result = validate(|v| {
        v.require("a", &a, 1, 2).transposable();
    });

    assert_eq!(result, Ok(()));
}

#[test]
fn test_view() {
    init();

    let mut m = square3();

    {
        let mut v = m.view(1..=2, 0..=1).unwrap();

        assert!(v.is_copy_on_write());
        assert!(!v.is_copied());
        assert_eq!(v.shape(), (2, 2));
        assert_eq!(v.get(1, 1), Ok(Value::F64(8.0)));

        v.set(0, 0, 40.0).unwrap();

        assert!(v.is_copied());
        assert_eq!(v.get(0, 0), Ok(Value::F64(40.0)));
        assert_eq!(v.to_matrix(), Ok(mat![[40.0, 5.0], [7.0, 8.0]]));
        assert!(matches!(v.get(2, 0), Err(Error::OutOfRange(_))));
    }

    assert_eq!(m.get_f64(1, 0), Ok(4.0));

    {
        let mut v = m.view_mut(1..=2, 0..=1).unwrap().transposed();

        assert!(v.is_transposed());
        assert!(!v.is_copy_on_write());

        v.set(0, 1, 70.0).unwrap();

        assert_eq!(v.to_matrix(), Ok(mat![[4.0, 70.0], [5.0, 8.0]]));
        assert_eq!(v.trace(), Ok(12.0));
    }

    assert_eq!(m.get_f64(2, 0), Ok(70.0));

    let v = m.view(0..=0, ALL).unwrap().transposed();

    assert_eq!(v.shape(), (3, 1));
    assert_eq!(v.to_vec_f64(), Ok(vec![1.0, 2.0, 3.0]));
    assert_eq!(v.norm_fro(), Ok(14f64.sqrt()));
}

proptest! {
    #[test]
    fn prop_transpose_twice(rows in 0usize..6, cols in 0usize..6, seed in any::<u64>()) {
        let m = Factory::default().rand_with(&mut SeededRng::new(seed, 1), rows, cols);

        let t = m.transpose();

        prop_assert_eq!(t.dims(), [cols, rows]);
        prop_assert_eq!(t.transpose(), m);
    }

    #[test]
    fn prop_split_and_stack(
        rows in 2usize..6,
        cols in 2usize..6,
        row_split in 1usize..5,
        col_split in 1usize..5,
        seed in 0u64..1000,
    ) {
        prop_assume!(row_split < rows && col_split < cols);

        let m = Factory::default().randn_with(&mut SeededRng::new(seed, 2), rows, cols);
        let r1 = IndexRange::new(0, row_split as isize - 1);
        let r2 = IndexRange::new(row_split as isize, END);
        let c1 = IndexRange::new(0, col_split as isize - 1);
        let c2 = IndexRange::new(col_split as isize, END);

        let top = Matrix::hstack(&[&m.slice(r1, c1).unwrap(), &m.slice(r1, c2).unwrap()]).unwrap();
        let bottom =
            Matrix::hstack(&[&m.slice(r2, c1).unwrap(), &m.slice(r2, c2).unwrap()]).unwrap();

        prop_assert_eq!(Matrix::vstack(&[&top, &bottom]).unwrap(), m);
    }

    #[test]
    fn prop_wrap_negative_index(index in 0usize..20, size in 1usize..20) {
        prop_assume!(index < size);

        prop_assert_eq!(wrap_index(index as isize, size), Ok(index));
        prop_assert_eq!(wrap_index(index as isize - size as isize, size), Ok(index));
    }

    #[test]
    fn prop_inverse(n in 1usize..6, seed in any::<u64>()) {
        let factory = Factory::default();
        let a = factory.rand_with(&mut SeededRng::new(seed, 3), n, n);
        let a = a.add(&(&factory.eye(n) * n as f64)).unwrap();

        prop_assert!((&a * &a.inverse().unwrap()).all_close(&factory.eye(n), 0.0, 1e-12));
    }

    #[test]
    fn prop_expm_inverse(n in 1usize..5, seed in any::<u64>()) {
        let factory = Factory::default();
        let a = &factory.randn_with(&mut SeededRng::new(seed, 4), n, n) * 0.25;
        let b = &expm(&a).unwrap() * &expm(&-&a).unwrap();

        prop_assert!(b.all_close(&factory.eye(n), 0.0, 1e-8));
    }

    #[test]
    fn prop_cum_sum_ends_with_sum(len in 1usize..40, seed in any::<u64>()) {
        let m = Factory::default().randn_with(&mut SeededRng::new(seed, 5), 1, len);
        let last = m.cum_sum().unwrap().get_f64(0, len - 1).unwrap();

        prop_assert!((last - m.sum_f64().unwrap()).abs() < 1e-12);

        let sums = m.cum_sum().unwrap();

        for k in 1..len {
            let diff = sums.get_f64(0, k).unwrap() - sums.get_f64(0, k - 1).unwrap();

            prop_assert!((diff - m.get_f64(0, k).unwrap()).abs() < 1e-9);
        }
    }
}
