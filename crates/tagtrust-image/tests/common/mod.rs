//! Common test utilities for tagtrust-image
//!
//! This module provides shared test infrastructure including:
//! - Recording mocks for the trust repository, engine and credential store
//! - Fixtures for signed records, push streams and a wired-up client

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
