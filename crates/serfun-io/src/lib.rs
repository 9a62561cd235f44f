#![forbid(unsafe_code)]
//! serfun-io: the storage collaborator contract and its backends, plus the tagged
//! value codec used to persist points.

pub mod codec;
pub mod memory_store;
pub mod store;

pub use codec::{SeriesValueCodec, Tag};
pub use memory_store::MemorySeriesStore;
pub use store::{build_store_from_config, FsSeriesStore, SeriesStore};
