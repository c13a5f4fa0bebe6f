//! Fixtures shared by the tests of every crate.

pub mod fix;
