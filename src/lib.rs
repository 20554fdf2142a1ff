#![forbid(unsafe_code)]
//! Persistent ordered maps and sets backed by weight balanced trees.
//! See the map and set modules for details.

pub(crate) mod tree;
mod iter;
pub mod map;
pub mod merge;
pub mod set;

#[cfg(feature = "serde")]
mod serde_impl;

pub use crate::iter::{Iter, Keys, Values};

#[cfg(test)]
mod tests;
