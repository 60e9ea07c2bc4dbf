pub mod cleanse;
pub mod markup;
pub mod pipeline;
