// Package model provides the value types, codec and entry structures
// stored by the cache.

pub mod entry;
pub mod payload;
pub mod value;
pub mod value_decoder;
pub mod value_encoder;


pub use entry::{acquire_entry, recycle_entry, Entry};
pub use value::Value;
pub use value_decoder::CodecError;
