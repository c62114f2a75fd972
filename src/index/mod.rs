//! Persistent work index
//!
//! The index is the authoritative record of every group ever scheduled:
//! identity → paths. It is stored as one compressed blob of
//! `identity,path1,path2,...` lines and is always read and written whole.

mod codec;
mod format;
mod store;
mod types;

#[cfg(feature = "zstd")]
pub use codec::ZstdCodec;
pub use codec::{default_codec, IndexCodec};
pub use format::{decode_lines, encode_lines};
pub use store::IndexStore;
pub use types::WorkIndex;
