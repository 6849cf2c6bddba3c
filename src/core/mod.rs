//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a `SeaORM` connection and returns
//! [`crate::errors::Result`], so the same functions serve the web handlers,
//! the start-up seeding in `main` and the tests.

pub mod account;
pub mod cart;
pub mod category;
pub mod listing;
pub mod order;
pub mod password;
pub mod pricing;
pub mod product;
