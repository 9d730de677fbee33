pub mod fetch;
pub mod mime;
pub mod vision;

pub use fetch::{HttpImageFetcher, check_content_type};
pub use mime::{is_image, sniff_image_mime};
pub use vision::{DescribeOptions, VisionDescriber, VisionProvider, describe_image};
