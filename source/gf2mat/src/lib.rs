// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dense and sparse matrices over GF(2) and their reduction to diagonal form.
//!
//! The reduction records every row and column operation it applies, so the
//! transforms `P` and `Q` with `P * M * Q = D` can be rebuilt afterwards,
//! together with a kernel basis of `M`.

mod error;
pub use error::{Error, Result};

pub mod matrix;
pub use matrix::{BinaryMatrix, DenseMatrix, Representation, SparseMatrix, diagonal_rank};

pub mod operation;
pub use operation::Operation;

pub mod reduction;
pub use reduction::{DiagonalReducer, ReducerConfig, Reduction};

pub mod vector;
pub use vector::BinaryVector;

pub mod work_group;
pub use work_group::WorkGroup;
