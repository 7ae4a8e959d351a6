//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Purger: runs a cleanup operation (note TTL sweep, visitor eviction) on a
//!   fixed period with an error budget

mod purger;

pub use purger::{Purger, PurgerConfig, PurgerState, PurgerStatus};
