#![cfg(test)]

pub mod common;
pub mod scenario_tests;
pub mod shared_dependency_tests;
