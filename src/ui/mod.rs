pub mod output;

pub use output::{display_answer, display_catalog, display_summary, display_truncated};
