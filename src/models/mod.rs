pub mod feed;
pub mod record;
pub mod window;

pub use feed::Feed;
pub use record::{CellValue, RecordSet};
pub use window::DateWindow;
