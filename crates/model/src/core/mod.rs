pub mod value;
pub mod watermark;
