//! Common test infrastructure for klaudiush-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Version strings, tags, test data
//! - `fixtures`: In-memory release archives, checksums, fake installs
//! - `mock_server`: Wiremock setup for the release API and asset downloads
//! - `runners`: Scripted `CommandRunner` for `which` and `brew`

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod fixtures;
pub mod mock_server;
pub mod runners;

pub use constants::*;
pub use fixtures::*;
pub use mock_server::*;
pub use runners::*;
