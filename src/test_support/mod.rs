//! Test utilities for depod unit tests.

pub mod fixtures;
