//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod balance;
pub mod exchange;
pub mod savings;
pub mod task;

pub use balance::*;
pub use exchange::*;
pub use savings::*;
pub use task::*;
