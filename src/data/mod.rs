//! Data loading
//!
//! Readers produce a shared [`FeatureSet`](crate::features::FeatureSet)
//! plus labels and implement the [`Dataset`](crate::core::Dataset) trait.

pub mod libsvm;

pub use self::libsvm::*;
