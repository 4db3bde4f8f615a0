pub mod opcode;

pub use opcode::{decode, encode, CodecError, CodecResult};
