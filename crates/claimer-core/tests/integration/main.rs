mod common;
mod discovery_tests;
mod run_tests;
