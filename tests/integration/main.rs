#[path = "../fixtures/mod.rs"]
mod fixtures;

mod cli_test;
