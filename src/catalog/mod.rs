//! Core `Catalog` type orchestrating allocation, repair and import.

pub mod allocate;
pub mod audit;
pub mod import;
pub mod lifecycle;
pub mod repair;

pub use lifecycle::Catalog;
