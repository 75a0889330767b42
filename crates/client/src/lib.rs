//! Client for the CUIC security permissions subsystem
//!
//! Authenticates against the cross-domain probe, lists securable entities,
//! reads and writes single grants, and propagates one grant across every
//! entity of a kind.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod permissions;
pub mod propagate;
pub mod session;

pub use auth::{Authenticator, CookieScope, SESSION_COOKIES};
pub use catalog::Directory;
pub use client::{CuicClient, CuicClientBuilder};
pub use config::ClientConfig;
pub use error::ClientError;
pub use propagate::{PermissionBackend, Propagator};
pub use session::{Session, SessionStore};

pub use cuic_core::{
    Entity, EntityFamily, EntityKind, EntityListing, GrantRequest, PermissionInput,
    PermissionLevel, PropagationOutcome, PropagationReport, Subject, SubjectKind,
};
