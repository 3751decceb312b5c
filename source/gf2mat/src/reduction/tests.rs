// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use expect_test::expect;

use super::{DiagonalReducer, Progress, ReducerConfig};
use crate::matrix::{BinaryMatrix, DenseMatrix, SparseMatrix, diagonal_rank};
use crate::operation::write_operations;
use crate::work_group::WorkGroup;

fn dense(text: &str) -> DenseMatrix {
    text.parse().expect("matrix should parse")
}

fn log_text(reduction: &super::Reduction) -> (String, String) {
    let mut rows = Vec::new();
    let mut columns = Vec::new();
    write_operations(reduction.row_operations(), &mut rows)
        .expect("writing to memory should succeed");
    write_operations(reduction.column_operations(), &mut columns)
        .expect("writing to memory should succeed");
    (
        String::from_utf8(rows).expect("log should be utf-8"),
        String::from_utf8(columns).expect("log should be utf-8"),
    )
}

#[test]
fn default_config() {
    let config = ReducerConfig::default();
    assert!((config.densify_threshold - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.densify_min_dimension, 512);
    assert_eq!(config.initial_stat_interval, 64);
    assert_eq!(config.stat_period, Duration::from_secs(1));
    assert!(ReducerConfig::without_densification().densify_threshold.is_infinite());
}

#[test]
fn zero_stat_interval_is_clamped() {
    let config = ReducerConfig::default().with_initial_stat_interval(0);
    assert_eq!(config.initial_stat_interval, 1);
}

#[test]
fn progress_grows_interval_when_checks_are_quick() {
    let config = ReducerConfig::default()
        .with_initial_stat_interval(4)
        .with_stat_period(Duration::from_secs(3600));
    let mut progress = Progress::new(&config);
    assert!(!progress.is_due(0));
    assert!(!progress.is_due(3));
    assert!(progress.is_due(4));
    assert_eq!(progress.interval, 8);
    assert_eq!(progress.next_check, 12);
    assert!(!progress.is_due(11));
    assert!(progress.is_due(12));
    assert_eq!(progress.interval, 16);
}

#[test]
fn progress_shrinks_interval_when_checks_are_slow() {
    let config = ReducerConfig::default()
        .with_initial_stat_interval(4)
        .with_stat_period(Duration::ZERO);
    let mut progress = Progress::new(&config);
    std::thread::sleep(Duration::from_millis(1));
    assert!(progress.is_due(4));
    assert_eq!(progress.interval, 2);
    std::thread::sleep(Duration::from_millis(1));
    assert!(progress.is_due(6));
    assert_eq!(progress.interval, 1);
    std::thread::sleep(Duration::from_millis(1));
    assert!(progress.is_due(7));
    assert_eq!(progress.interval, 1);
}

#[test]
fn rows_summing_to_zero() {
    let mut matrix = dense("1 0 1\n0 1 1\n1 1 0");
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 2);
    assert_eq!(matrix, dense("1 0 0\n0 1 0\n0 0 0"));
    let (rows, columns) = log_text(&reduction);
    expect![[r#"
        A 0 2
        A 1 2
    "#]]
    .assert_eq(&rows);
    expect![[r#"
        A 0 2
        A 1 2
    "#]]
    .assert_eq(&columns);
    let kernel = reduction.kernel_basis();
    assert_eq!(kernel.shape(), (3, 1));
    assert_eq!(kernel.column(0), &[0, 1, 2]);
    assert_eq!(reduction.coimage_basis().shape(), (3, 2));
}

#[test]
fn pivot_search_swaps_rows_and_columns() {
    let mut matrix = dense("0 0 0\n0 0 1");
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 1);
    assert_eq!(diagonal_rank(&matrix), Some(1));
    let (rows, columns) = log_text(&reduction);
    expect![[r#"
        S 0 1
    "#]]
    .assert_eq(&rows);
    expect![[r#"
        S 0 2
    "#]]
    .assert_eq(&columns);
}

#[test]
fn densified_reduction_matches_sparse_reduction() {
    let text = "1 1 0 1 0 1\n0 1 1 0 1 1\n1 0 1 1 1 0\n0 1 0 1 1 1\n1 1 1 0 0 1\n0 0 1 1 1 1";
    let mut plain = dense(text).to_sparse();
    let plain_reduction = DiagonalReducer::new()
        .with_config(ReducerConfig::without_densification())
        .reduce(&mut plain);

    let config = ReducerConfig::default()
        .with_densify_threshold(0.0)
        .with_densify_min_dimension(1)
        .with_initial_stat_interval(2);
    let mut densified = dense(text).to_sparse();
    let densified_reduction = DiagonalReducer::new().with_config(config).reduce(&mut densified);

    assert_eq!(densified, plain);
    assert_eq!(densified_reduction.rank(), plain_reduction.rank());
    assert_eq!(
        densified_reduction.row_operations(),
        plain_reduction.row_operations()
    );
    assert_eq!(
        densified_reduction.column_operations(),
        plain_reduction.column_operations()
    );
}

#[test]
fn dense_matrices_are_never_densified() {
    let config = ReducerConfig::default()
        .with_densify_threshold(0.0)
        .with_densify_min_dimension(0)
        .with_initial_stat_interval(1);
    let mut matrix = dense("1 1 1\n1 1 1\n1 1 1");
    let reduction = DiagonalReducer::new().with_config(config).reduce(&mut matrix);
    assert_eq!(reduction.rank(), 1);
    assert_eq!(diagonal_rank(&matrix), Some(1));
}

#[test]
fn dedicated_work_group() {
    let group = WorkGroup::new(3)
        .expect("worker threads should start")
        .with_min_parallel_items(0);
    let reducer = DiagonalReducer::with_work_group(&group);
    let mut matrix = SparseMatrix::identity(7);
    matrix.add_row(0, 6);
    matrix.add_column(3, 1);
    let reduction = reducer.reduce(&mut matrix);
    assert_eq!(reduction.rank(), 7);
    assert!(matrix.equals(&DenseMatrix::identity(7)));
}

#[test]
fn transforms_are_cached() {
    let mut matrix = dense("1 1\n1 1");
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    let first: *const SparseMatrix = reduction.column_transform();
    let second: *const SparseMatrix = reduction.column_transform();
    assert_eq!(first, second);
    let (rows, columns) = reduction.into_operations();
    assert_eq!(rows.len(), 1);
    assert_eq!(columns.len(), 1);
}
