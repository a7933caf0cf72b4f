//! Domain Layer
//!
//! Values and interfaces shared by every other layer.
//!
//! ## Structure
//!
//! - `value_objects/` - Immutable value types (ChangeEvent, NodeId, RemoteRoot)
//! - `ports/` - Interface definitions for infrastructure (Remote Collaborator)

pub mod ports;
pub mod value_objects;
