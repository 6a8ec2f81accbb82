/// Schedule of Classes API access
mod client;
mod error;
mod types;

pub use client::{SocClient, SocConfig};
pub use error::SocError;
pub use types::{Course, Section, Subject};
