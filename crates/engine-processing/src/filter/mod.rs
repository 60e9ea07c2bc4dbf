pub mod existence;
