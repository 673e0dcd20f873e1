#[path = "../fixtures/mod.rs"]
mod fixtures;

mod merge_test;
mod store_test;
