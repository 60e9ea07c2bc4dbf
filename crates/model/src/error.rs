use crate::core::watermark::WatermarkKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A target-side value could not be read as a watermark of the expected kind.
    #[error("Cannot interpret {value} as a {kind} watermark")]
    InvalidWatermark { value: String, kind: WatermarkKind },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}
