// Integration test cases for the cache facade and engines.

mod cases_compression_test;
mod cases_concurrent_test;
