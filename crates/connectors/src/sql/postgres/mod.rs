pub mod adapter;
pub mod params;
pub mod row;
pub mod utils;
