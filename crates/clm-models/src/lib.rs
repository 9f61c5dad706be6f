#![deny(missing_docs)]

//! # CLM Models
//!
//! Data types shared by the CLM operator console crates.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`account`] | Account identifier, validated as a URL path segment |
//! | [`error`] | [`ModelError`] returned by validating constructors |
//! | [`token`] | OAuth credentials, token endpoint response, persisted token |
//! | [`configuration`] | DocLauncher configurations and listing pages |
//! | [`task`] | Task creation request, result and launch resolution |
//! | [`document`] | Document attribute lookups |
//!
//! Remote entities use the API's PascalCase field names on the wire; the
//! persisted token uses the snake_case layout of the token file.

pub mod account;
pub mod configuration;
pub mod document;
pub mod error;
pub mod task;
pub mod token;

// Re-export all public types at crate root for convenience.
pub use account::*;
pub use configuration::*;
pub use document::*;
pub use error::ModelError;
pub use task::*;
pub use token::*;
