pub mod consumer;
pub mod error;
pub mod filter;
pub mod migrator;
pub mod producer;
pub mod retry;
pub mod transform;
