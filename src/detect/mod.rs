mod filter;
mod result;

pub use filter::filter_by_type;
pub use result::{parse_detected_objects, parse_target_objects, DetectedObject};
