//! Small index-keyed collections shared by the kstar engine.
//!
//! These mirror the `Ref`/`RefVec`/`RefMap` family used across the aries solver's own
//! collections, trimmed down to what a single-threaded search engine needs: opaque integer
//! handles and dense/sparse stores keyed by them.

pub mod ref_store;

pub use ref_store::{Ref, RefMap, RefVec};
