pub mod admin;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod goal;
pub mod identity;
pub mod io;
pub mod onboarding;
pub mod policy;
pub mod questions;
pub mod reflection;
pub mod store;
pub mod targets;
pub mod types;
pub mod user;

pub use error::{PulseError, Result};
