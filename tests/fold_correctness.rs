//! Integration tests for the host pooling layers.
//!
//! These exercise the public API end to end: layers driven through the
//! `Layer` trait with a `Meta` context, including layer stacking and the
//! error paths a framework above would hit.

use foldpool::{
    Domain, FpropState, KMaxConfig, KMaxPooling, Layer, Matrix, MaxFolding, Meta, PoolError,
    Space, SumFolding,
};

fn matrix(rows: &[Vec<f32>]) -> Matrix {
    Matrix::from_rows(rows).unwrap()
}

#[test]
fn sum_folding_full_pass() {
    let x = matrix(&[
        vec![1.0, 2.0],
        vec![3.0, 4.0],
        vec![0.0, 5.0],
        vec![9.0, 1.0],
    ]);
    let mut meta = Meta::with_space_below(Space::host(4, 2));

    let (y, state) = SumFolding.fprop(x, &mut meta).unwrap();
    assert_eq!(y.as_slice(), &[1.0, 7.0, 12.0, 5.0]);

    let delta = matrix(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
    let grad = SumFolding.bprop(delta, &mut meta, &state).unwrap();
    assert_eq!(grad.as_slice(), &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn max_folding_gradient_is_sparse() {
    let x = matrix(&[
        vec![1.0, 2.0],
        vec![3.0, 4.0],
        vec![0.0, 5.0],
        vec![9.0, 1.0],
    ]);
    let mut meta = Meta::with_space_below(Space::host(4, 2));

    let (y, state) = MaxFolding.fprop(x, &mut meta).unwrap();
    assert_eq!(y.as_slice(), &[1.0, 5.0, 9.0, 4.0]);

    let delta = matrix(&[vec![1.0, 1.0], vec![1.0, 1.0]]);
    let grad = MaxFolding.bprop(delta, &mut meta, &state).unwrap();

    // Exactly one of each pooled pair receives the gradient.
    for i in 0..4 {
        assert_eq!(grad.as_slice()[i] + grad.as_slice()[i + 4], 1.0);
    }
}

#[test]
fn layers_stack_through_shared_meta() {
    // kmax (k=2 over one group of 4) then sum fold: 4x2 -> 2x2 -> 1x2.
    let kmax = KMaxPooling::new(KMaxConfig::new(2, 4).unwrap()).unwrap();
    let x = matrix(&[
        vec![5.0, 0.0],
        vec![1.0, 6.0],
        vec![4.0, 7.0],
        vec![2.0, 3.0],
    ]);
    let mut meta = Meta::with_space_below(Space::host(4, 2));

    let (pooled, kmax_state) = kmax.fprop(x, &mut meta).unwrap();
    assert_eq!(pooled.as_slice(), &[5.0, 6.0, 4.0, 7.0]);

    // The layer above consumes the space this layer recorded.
    meta.space_below = meta.space_above;
    let (folded, fold_state) = SumFolding.fprop(pooled, &mut meta).unwrap();
    assert_eq!(folded.as_slice(), &[9.0, 13.0]);

    // Backward through both layers.
    let delta = matrix(&[vec![1.0, 2.0]]);
    let grad_fold = SumFolding.bprop(delta, &mut meta, &fold_state).unwrap();
    assert_eq!(grad_fold.as_slice(), &[1.0, 2.0, 1.0, 2.0]);

    meta.space_above = Some(Space::host(2, 2));
    let grad = kmax.bprop(grad_fold, &mut meta, &kmax_state).unwrap();
    assert_eq!(grad.shape(), (4, 2));
    assert_eq!(grad.as_slice(), &[1.0, 0.0, 0.0, 2.0, 1.0, 2.0, 0.0, 0.0]);
}

#[test]
fn fprop_without_space_below_is_rejected() {
    let x = Matrix::zeros(4, 2);
    let mut meta = Meta::default();
    assert!(matches!(
        SumFolding.fprop(x, &mut meta),
        Err(PoolError::Validation(_))
    ));
}

#[test]
fn bprop_with_foreign_state_is_rejected() {
    let x = matrix(&[vec![1.0], vec![2.0]]);
    let mut meta = Meta::with_space_below(Space::host(2, 1));
    MaxFolding.fprop(x, &mut meta).unwrap();

    // Sum folding's state handed to max folding's bprop.
    let delta = matrix(&[vec![1.0]]);
    assert!(matches!(
        MaxFolding.bprop(delta, &mut meta, &FpropState::None),
        Err(PoolError::Validation(_))
    ));
}

#[test]
fn folding_preserves_domain_tag() {
    let x = matrix(&[vec![1.0], vec![2.0]]);
    let mut meta = Meta::with_space_below(Space {
        rows: 2,
        cols: 1,
        domain: Domain::Host,
    });
    SumFolding.fprop(x, &mut meta).unwrap();
    assert_eq!(meta.space_above.unwrap().domain, Domain::Host);
}

#[test]
fn extra_meta_keys_survive_both_passes() {
    let x = matrix(&[vec![1.0], vec![2.0]]);
    let mut meta = Meta::with_space_below(Space::host(2, 1));
    meta.extra.insert("sentence_len".into(), "24".into());
    meta.extra.insert("phase".into(), "train".into());

    let (_, state) = MaxFolding.fprop(x, &mut meta).unwrap();
    let delta = matrix(&[vec![1.0]]);
    MaxFolding.bprop(delta, &mut meta, &state).unwrap();

    assert_eq!(meta.extra["sentence_len"], "24");
    assert_eq!(meta.extra["phase"], "train");
}

#[test]
fn kmax_handles_group_equal_to_input() {
    // group_size == rows: a single group spanning the whole input.
    let kmax = KMaxPooling::new(KMaxConfig::new(3, 6).unwrap()).unwrap();
    let x = matrix(&[
        vec![0.0],
        vec![9.0],
        vec![2.0],
        vec![7.0],
        vec![1.0],
        vec![8.0],
    ]);
    let mut meta = Meta::with_space_below(Space::host(6, 1));
    let (y, _) = kmax.fprop(x, &mut meta).unwrap();
    // Rows 1, 3, 5 hold the three largest; order preserved.
    assert_eq!(y.as_slice(), &[9.0, 7.0, 8.0]);
}

#[test]
fn kmax_with_k_equal_group_is_identity() {
    let kmax = KMaxPooling::new(KMaxConfig::new(2, 2).unwrap()).unwrap();
    let x = matrix(&[vec![3.0], vec![1.0], vec![4.0], vec![1.0]]);
    let mut meta = Meta::with_space_below(Space::host(4, 1));
    let (y, _) = kmax.fprop(x.clone(), &mut meta).unwrap();
    assert_eq!(y.as_slice(), x.as_slice());
}

#[test]
fn negative_values_fold_correctly() {
    let x = matrix(&[vec![-1.0, -5.0], vec![-3.0, -2.0]]);
    let mut meta = Meta::with_space_below(Space::host(2, 2));
    let (y, state) = MaxFolding.fprop(x, &mut meta).unwrap();
    assert_eq!(y.as_slice(), &[-1.0, -2.0]);

    let delta = matrix(&[vec![1.0, 1.0]]);
    let grad = MaxFolding.bprop(delta, &mut meta, &state).unwrap();
    assert_eq!(grad.as_slice(), &[1.0, 0.0, 0.0, 1.0]);
}
