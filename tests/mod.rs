use nalgebra::*;
use polya::*;
use polya::optim::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

const EPS : f64 = 10E-10;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn scenario() -> (DMatrix<u32>, DVector<f64>) {
    let counts = DMatrix::from_row_slice(4, 3, &[5, 0, 0, 0, 5, 0, 0, 0, 5, 2, 2, 1]);
    (counts, DVector::from_element(4, 1.0))
}

fn relative_distance(a : &DVector<f64>, b : &DVector<f64>) -> f64 {
    (a - b).norm() / b.norm()
}

#[test]
fn concentrated_sample_log_likelihood() {
    let alpha = DVector::from_element(3, 1.0);
    let sample = DVector::from_vec(vec![5u32, 0, 0]);
    let ll = log_likelihood(&alpha, &sample).unwrap();
    assert!((ll - (1.0f64 / 21.0).ln()).abs() < EPS);
}

#[test]
fn bursty_counts_give_small_symmetric_alpha() {
    init_logging();
    let (counts, weights) = scenario();
    let minka = estimate_minka(&counts, &weights, 1E-10, 1000).unwrap();
    let wallach = estimate_wallach(&counts, &weights, 1E-10, 1000).unwrap();
    assert!(minka.converged() && wallach.converged());

    let mean = minka.alpha.mean();
    assert!(minka.alpha.iter().all(|a| (a - mean).abs() < 0.05 * mean ));
    assert!(minka.alpha.iter().all(|a| *a < 1.0 ));
    assert!(relative_distance(&wallach.alpha, &minka.alpha) < 1E-3);
}

#[test]
fn estimators_agree_on_sampled_counts() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(2021);
    let truth = DVector::from_vec(vec![2.0, 5.0, 3.0]);
    let counts = Dcm::new(Method::default(), 40).rv(&truth, 300, &mut rng).unwrap();
    let weights = DVector::from_element(300, 1.0);
    let minka = estimate_minka(&counts, &weights, 1E-10, 1000).unwrap();
    let wallach = estimate_wallach(&counts, &weights, 1E-10, 1000).unwrap();
    assert!(minka.converged() && wallach.converged());
    assert!(relative_distance(&wallach.alpha, &minka.alpha) < 1E-3);

    // Sampling noise over 300 rows stays well inside this band.
    for (est, true_a) in minka.alpha.iter().zip(truth.iter()) {
        assert!((est - true_a).abs() < 0.3 * true_a);
    }
}

#[test]
fn converged_estimates_are_fixed_points() {
    let (counts, weights) = scenario();
    let threshold = 1E-10;

    let minka = Minka::new(MinkaConfig { fixed : FixedPoint::new(threshold, 1000), ..Default::default() });
    let est = minka.estimate(&counts, &weights).unwrap();
    let mut alpha = est.alpha.clone();
    minka.sweep(&counts, &weights, &mut alpha).unwrap();
    assert!(alpha.iter().zip(est.alpha.iter()).all(|(a, b)| (a - b).abs() < threshold ));

    let wallach = Wallach::new(WallachConfig { fixed : FixedPoint::new(threshold, 1000), ..Default::default() });
    let hist = Histograms::build(&counts, &weights);
    let est = wallach.estimate_from(&hist).unwrap();
    let mut alpha = est.alpha.clone();
    wallach.sweep(&hist, &mut alpha).unwrap();
    assert!(alpha.iter().zip(est.alpha.iter()).all(|(a, b)| (a - b).abs() < threshold ));
}

#[test]
fn sweeps_respect_floors() {
    // Second dimension is never observed, so its ratio is zero at every sweep.
    let counts = DMatrix::from_row_slice(3, 3, &[4, 0, 1, 0, 0, 3, 2, 0, 2]);
    let weights = DVector::from_element(3, 1.0);

    let minka = Minka::default();
    let mut alpha = DVector::from_element(3, 1.0);
    for _ in 0..20 {
        minka.sweep(&counts, &weights, &mut alpha).unwrap();
        assert!(alpha.iter().all(|a| *a >= MINKA_FLOOR ));
    }
    assert_eq!(alpha[1], MINKA_FLOOR);

    let wallach = Wallach::default();
    let hist = Histograms::build(&counts, &weights);
    let mut alpha = DVector::from_element(3, 1.0);
    for _ in 0..20 {
        wallach.sweep(&hist, &mut alpha).unwrap();
        assert!(alpha.iter().all(|a| *a >= WALLACH_FLOOR ));
    }
    assert_eq!(alpha[1], WALLACH_FLOOR);
}

#[test]
fn zero_rows_do_not_change_estimates() {
    let (counts, weights) = scenario();
    let padded = DMatrix::from_fn(6, 3, |i, j| if i < 4 { counts[(i, j)] } else { 0 });
    let padded_weights = DVector::from_element(6, 1.0);

    let a = estimate_minka(&counts, &weights, 1E-10, 1000).unwrap();
    let b = estimate_minka(&padded, &padded_weights, 1E-10, 1000).unwrap();
    assert!(relative_distance(&a.alpha, &b.alpha) < EPS);

    let a = estimate_wallach(&counts, &weights, 1E-10, 1000).unwrap();
    let b = estimate_wallach(&padded, &padded_weights, 1E-10, 1000).unwrap();
    assert_eq!(a.alpha, b.alpha);
}

#[test]
fn zero_weights_drop_rows() {
    let (counts, _) = scenario();
    let extra = DMatrix::from_fn(5, 3, |i, j| if i < 4 { counts[(i, j)] } else { [9, 1, 0][j] });
    let weights = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0, 0.0]);
    let a = estimate_wallach(&counts, &DVector::from_element(4, 1.0), 1E-10, 1000).unwrap();
    let b = estimate_wallach(&extra, &weights, 1E-10, 1000).unwrap();
    assert!(relative_distance(&a.alpha, &b.alpha) < EPS);
}

#[test]
fn configured_method_drives_ml() {
    let (counts, weights) = scenario();
    let method = Method::load(r#"{ "method" : "minka", "threshold" : 1e-10, "max_iterations" : 1000 }"#.as_bytes()).unwrap();
    let dcm = Dcm::new(method, 5);
    let alpha = dcm.ml(&counts, &weights).unwrap();
    let direct = estimate_minka(&counts, &weights, 1E-10, 1000).unwrap();
    assert_eq!(alpha, direct.alpha);

    // The estimate maximizes the summed log-likelihood along each axis.
    let total = |a : &DVector<f64>| dcm.ll(a, &counts).unwrap().sum();
    let best = total(&alpha);
    for d in 0..3 {
        for scale in [0.9, 1.1].iter() {
            let mut moved = alpha.clone();
            moved[d] *= scale;
            assert!(total(&moved) < best);
        }
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    let (counts, weights) = scenario();
    assert_eq!(
        estimate_minka(&counts, &DVector::from_element(3, 1.0), 1E-6, 10),
        Err(DcmError::DimensionMismatch { expected : 4, found : 3 })
    );
    assert_eq!(
        estimate_wallach(&counts, &weights, -1.0, 10),
        Err(DcmError::InvalidThreshold(-1.0))
    );
    assert_eq!(
        estimate_wallach(&DMatrix::<u32>::zeros(4, 0), &weights, 1E-6, 10),
        Err(DcmError::NoDimensions)
    );
}
