//! Test data builders

mod fixtures;

pub use fixtures::TestDataFactory;
