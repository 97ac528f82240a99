pub mod store;
pub mod watermark;

pub use store::{load_or_default, CheckpointError, CheckpointStore, FileCheckpointStore};
pub use watermark::{Watermark, WatermarkParseError, WATERMARK_FORMAT};
