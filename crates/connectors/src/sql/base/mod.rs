pub mod destination;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod requests;
pub mod source;
