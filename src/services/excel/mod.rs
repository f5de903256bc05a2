pub mod decoder;
pub mod profiler;
pub mod recommender;
pub mod types;
pub mod utils;

pub use decoder::{decode, DecodeError};
pub use profiler::{column_summaries, detect_types, summarize};
pub use recommender::recommend;
pub use types::*;
pub use utils::check_extension;
