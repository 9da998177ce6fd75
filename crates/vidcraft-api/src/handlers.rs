//! Request handlers.

pub mod ai;
pub mod health;
pub mod renders;
pub mod tasks;

pub use ai::*;
pub use health::*;
pub use renders::*;
pub use tasks::*;
