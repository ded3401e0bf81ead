//! Integration tests for knit-lib.

mod common;
mod definitions_tests;
mod namespace_tests;
mod scenarios_tests;
