//! Game implementations.

pub mod deck;
