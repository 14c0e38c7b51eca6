//! Internal numerical utilities.

pub(crate) mod finite_difference;
