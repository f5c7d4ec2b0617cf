//!
//! # Decision tree learning
//! `sylva-trees` provides a pure Rust implementation of decision tree induction for nominal data.
//!
//! # The big picture
//!
//! `sylva-trees` is a crate in the `sylva` workspace. The core crate provides the dataset and the
//! `Fit`/`Predict` traits, this crate grows classification trees on top of them.
//!
//! A tree splits every node on the nominal feature with the highest information gain, with one
//! child per value, and does not reuse a feature below the node that split on it. Missing cells,
//! marked with [`sylva::MISSING`], are filled in before growing by trees trained on the remaining
//! columns. Reduced-error pruning on a held-back part of the data is available as an option.
//!
//! # Current state
//!
//! `sylva-trees` currently provides an [implementation](DecisionTree) of single-tree fitting for
//! classification. Continuous features are not supported.
//!

mod decision_trees;
mod error;

pub use decision_trees::*;
pub use error::{Result, TreeError};
