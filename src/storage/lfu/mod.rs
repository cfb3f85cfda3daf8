// Package lfu provides the frequency-based admission filter.

pub mod count_min_sketch;


pub use count_min_sketch::CountMinSketch;
