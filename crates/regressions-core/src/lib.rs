//! Snapshot regression checks for structured data, text and binary files,
//! images, tables and N-dimensional arrays.
//!
//! A check serializes the value under test, compares it with a stored
//! baseline and fails with a readable report when they differ. Missing
//! baselines are written on first run and stale ones can be regenerated.

pub mod arrays;
pub mod capability;
pub mod comparator;
pub mod config;
pub mod domain;
pub mod fixtures;
pub mod numerics;
pub mod protocol;
pub mod regression;
pub mod testing;
pub mod text_diff;

pub use arrays::{DType, ElementKind, NdArray};
pub use comparator::MismatchError;
pub use config::RegressionSettings;
pub use domain::{
    DataDirectory, RegressionError, RegressionErrorCategory, RegressionResult, TestIdentity,
};
pub use fixtures::data::DataCheck;
pub use fixtures::file::{Contents, FileCheck};
pub use fixtures::image::ImageCheck;
pub use fixtures::ndarrays::NdArraysCheck;
pub use fixtures::representers::{Representable, Represented, represent};
pub use fixtures::table::TableCheck;
pub use numerics::{Tolerance, ToleranceSpec};
pub use protocol::CheckOutcome;
pub use regression::{CheckResultExt, Regression};
