//! Type definitions for trust targets and signing roles

mod role;
mod target;

pub use role::*;
pub use target::*;
