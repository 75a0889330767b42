//! CUIC core types
//!
//! Entity kinds, permission levels and grant subjects shared by the client
//! and the command-line tool.

pub mod entity;
pub mod errors;
pub mod permission;
pub mod validation;

pub use entity::{Entity, EntityFamily, EntityKind, EntityListing};
pub use errors::{Error, Result};
pub use permission::{
    GrantRequest, PermissionInput, PermissionLevel, PropagationOutcome, PropagationReport,
    Subject, SubjectKind,
};
pub use validation::{ValidateConfig, validators};
