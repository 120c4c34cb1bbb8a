//! Storage layer tests

mod concurrency_tests;
