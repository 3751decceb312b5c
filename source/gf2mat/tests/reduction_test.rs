// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use gf2mat::operation::{read_operations, replay_columns, write_operations};
use gf2mat::{
    BinaryMatrix, BinaryVector, DenseMatrix, DiagonalReducer, ReducerConfig, SparseMatrix,
    WorkGroup, diagonal_rank,
};
use itertools::iproduct;
use proptest::prelude::*;
use rand::Rng;
use rand::prelude::*;

proptest! {
    #[test]
    fn reduces_to_diagonal_form(matrix in arbitrary_dense_matrix(40)) {
        let mut reduced = matrix.clone();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        assert_eq!(diagonal_rank(&reduced), Some(reduction.rank()));
        assert_eq!(reduction.shape(), matrix.shape());
        assert!(reduction.rank() <= matrix.rowcount().min(matrix.columncount()));
    }

    #[test]
    fn transforms_diagonalize(matrix in arbitrary_dense_matrix(30)) {
        let mut reduced = matrix.clone();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        let product = matrix
            .multiply_left(reduction.row_transform())
            .expect("shapes match")
            .multiply_right(reduction.column_transform())
            .expect("shapes match");
        assert_eq!(product, reduced);
    }

    #[test]
    fn kernel_basis_is_annihilated(matrix in arbitrary_dense_matrix(40)) {
        let mut reduced = matrix.to_sparse();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        let kernel = reduction.kernel_basis();
        assert_eq!(kernel.shape(), (matrix.columncount(), matrix.columncount() - reduction.rank()));
        assert!(matrix.multiply_right(kernel).expect("shapes match").is_zero());
    }

    #[test]
    fn coimage_has_full_rank_image(matrix in arbitrary_dense_matrix(30)) {
        let mut reduced = matrix.clone();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        let coimage = reduction.coimage_basis();
        assert_eq!(coimage.columncount(), reduction.rank());
        let mut image = matrix.multiply_right(coimage).expect("shapes match");
        let image_reduction = DiagonalReducer::new().reduce(&mut image);
        assert_eq!(image_reduction.rank(), reduction.rank());
    }

    #[test]
    fn coimage_combinations_are_not_annihilated(matrix in nonempty_dense_matrix(30)) {
        let mut reduced = matrix.clone();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        let coimage = reduction.coimage_basis();
        prop_assume!(reduction.rank() > 0);
        for _ in 0..16 {
            let mut coefficients: BinaryVector = (0..reduction.rank()).map(|_| thread_rng().gen_bool(0.5)).collect();
            if coefficients.is_zero() {
                coefficients.toggle(thread_rng().gen_range(0..reduction.rank()));
            }
            let combination = coimage.multiply_vector(&coefficients).expect("shapes match");
            assert!(!combination.is_zero());
            assert!(!matrix.multiply_vector(&combination).expect("shapes match").is_zero());
        }
    }

    #[test]
    fn representation_independent(matrix in arbitrary_dense_matrix(40)) {
        let mut dense = matrix.clone();
        let dense_reduction = DiagonalReducer::new().reduce(&mut dense);
        let mut sparse = matrix.to_sparse();
        let sparse_reduction = DiagonalReducer::new()
            .with_config(ReducerConfig::without_densification())
            .reduce(&mut sparse);
        let mut densified = matrix.to_sparse();
        let config = ReducerConfig::default()
            .with_densify_threshold(0.0)
            .with_densify_min_dimension(1)
            .with_initial_stat_interval(1);
        let densified_reduction = DiagonalReducer::new().with_config(config).reduce(&mut densified);
        assert!(sparse.equals(&dense));
        assert_eq!(densified, sparse);
        assert_eq!(sparse_reduction.rank(), dense_reduction.rank());
        assert_eq!(densified_reduction.rank(), dense_reduction.rank());
        assert_eq!(densified_reduction.column_operations(), sparse_reduction.column_operations());
        assert_eq!(densified_reduction.row_operations(), sparse_reduction.row_operations());
    }

    #[test]
    fn rank_is_invariant_under_transpose(matrix in arbitrary_dense_matrix(40)) {
        let mut reduced = matrix.clone();
        let mut transposed = matrix.transposed();
        let rank = DiagonalReducer::new().reduce(&mut reduced).rank();
        assert_eq!(DiagonalReducer::new().reduce(&mut transposed).rank(), rank);
    }

    #[test]
    fn column_log_replays_through_text(matrix in arbitrary_dense_matrix(30)) {
        let mut reduced = matrix.clone();
        let reduction = DiagonalReducer::new().reduce(&mut reduced);
        let mut buffer = Vec::new();
        write_operations(reduction.column_operations(), &mut buffer).expect("writing to memory should succeed");
        let operations = read_operations(buffer.as_slice()).expect("written log should parse");
        let transform: DenseMatrix = replay_columns(&operations, matrix.columncount());
        assert!(transform.equals(reduction.column_transform()));
    }
}

#[test]
fn rows_summing_to_zero() {
    let mut matrix: DenseMatrix = "1 0 1\n0 1 1\n1 1 0".parse().expect("matrix should parse");
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 2);
    assert_eq!(matrix.to_string(), "1 0 0\n0 1 0\n0 0 0\n");
    let kernel = reduction.kernel_basis();
    assert_eq!(kernel.columncount(), 1);
    assert_eq!(BinaryVector::from_column(kernel, 0).to_string(), "111");
}

#[test]
fn matrix_without_columns() {
    let mut matrix = SparseMatrix::zeros(4, 0);
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 0);
    assert_eq!(reduction.kernel_basis().columncount(), 0);
    assert_eq!(reduction.coimage_basis().columncount(), 0);
}

#[test]
fn matrix_without_rows() {
    let mut matrix = DenseMatrix::zeros(0, 3);
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 0);
    assert!(reduction.kernel_basis().equals(&DenseMatrix::identity(3)));
}

#[test]
fn identity_has_full_rank() {
    for dimension in [1, 7, 8, 9, 64] {
        let mut matrix = SparseMatrix::identity(dimension);
        let reduction = DiagonalReducer::new().reduce(&mut matrix);
        assert_eq!(reduction.rank(), dimension);
        assert!(reduction.row_operations().is_empty());
        assert!(reduction.column_operations().is_empty());
        assert_eq!(reduction.kernel_basis().columncount(), 0);
        assert_eq!(reduction.coimage_basis(), &SparseMatrix::identity(dimension));
    }
}

#[test]
fn zero_matrix_has_identity_kernel() {
    let mut matrix = SparseMatrix::zeros(5, 6);
    let reduction = DiagonalReducer::new().reduce(&mut matrix);
    assert_eq!(reduction.rank(), 0);
    assert_eq!(reduction.kernel_basis(), &SparseMatrix::identity(6));
    assert_eq!(reduction.coimage_basis().columncount(), 0);
}

#[test]
fn large_sparse_matrix_densifies_without_changing_the_result() {
    let _ = env_logger::builder().is_test(true).try_init();
    let size = 96;
    let mut rng = StdRng::seed_from_u64(7);
    let mut matrix = SparseMatrix::zeros(size, size);
    for (row, column) in iproduct!(0..size, 0..size) {
        if rng.gen_bool(0.08) {
            matrix.set((row, column), true);
        }
    }
    let group = WorkGroup::new(4)
        .expect("worker threads should start")
        .with_min_parallel_items(8);
    let config = ReducerConfig::default()
        .with_densify_min_dimension(32)
        .with_initial_stat_interval(8);

    let mut plain = matrix.clone();
    let plain_reduction = DiagonalReducer::with_work_group(&group)
        .with_config(ReducerConfig::without_densification())
        .reduce(&mut plain);
    let mut adaptive = matrix.clone();
    let adaptive_reduction = DiagonalReducer::with_work_group(&group)
        .with_config(config)
        .reduce(&mut adaptive);

    assert_eq!(adaptive, plain);
    assert_eq!(adaptive_reduction.rank(), plain_reduction.rank());
    assert_eq!(adaptive_reduction.column_operations(), plain_reduction.column_operations());
    assert!(matrix.multiply_right(adaptive_reduction.kernel_basis()).expect("shapes match").is_zero());
}

prop_compose! {
    fn arbitrary_dense_matrix(max_dimension: usize)(shape in (0..=max_dimension, 0..=max_dimension)) -> DenseMatrix {
        random_dense_matrix(shape.0, shape.1)
    }
}

prop_compose! {
    fn nonempty_dense_matrix(max_dimension: usize)(shape in (1..=max_dimension, 1..=max_dimension)) -> DenseMatrix {
        random_dense_matrix(shape.0, shape.1)
    }
}

fn random_dense_matrix(rowcount: usize, columncount: usize) -> DenseMatrix {
    let density = thread_rng().gen_range(0.0..=1.0);
    let mut matrix = DenseMatrix::with_shape(rowcount, columncount);
    for (row_index, column_index) in iproduct!(0..rowcount, 0..columncount) {
        if thread_rng().gen_bool(density) {
            matrix.set((row_index, column_index), true);
        }
    }
    matrix
}
