pub mod adapter;
pub mod ddl;
pub mod params;
pub mod row;
