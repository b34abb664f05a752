//! Core business logic for Safar.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the traits in [`reversal::store`].
//!
//! # Modules
//!
//! - `reversal` - Transaction reversal and deletion

pub mod reversal;
