pub mod render;
pub mod writer;

pub use render::{Reporter, WindowInfo};
pub use writer::ReportHandle;
