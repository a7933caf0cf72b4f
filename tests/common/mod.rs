//! Common test utilities for fleet scenario and detector tests.
//!
//! This module provides:
//! - `SourceTree`: a temp source root with a packaged archive in `dist/`
//! - Helpers to build fleets over a `MemoryRemote`
//! - Polling helpers for background threads

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
