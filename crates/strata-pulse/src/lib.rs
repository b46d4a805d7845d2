//! Commit history analytics: co-change, ownership, activity, churn and
//! commit dependencies.
//!
//! Every analyzer is a pure function over a [`strata_core::CommitHistory`]
//! and its [`strata_core::FileIndex`], returning a serializable result.
//! [`report::analyze_all`] runs them together on the rayon pool.

pub mod activity;
pub mod churn;
pub mod cochange;
pub mod deps;
pub mod matrix;
pub mod ownership;
pub mod patch;
pub mod report;

#[cfg(test)]
mod fixtures;
