mod config;
pub use config::{Config, ConfigLayer};

mod errors;
pub use errors::{Error, Result};

mod oci_digest;
pub use oci_digest::OciDigest;

mod requests;
pub mod transport;
pub use transport::Transport;

pub mod governor;
pub use governor::RateLimitGovernor;

pub mod commits;
pub mod github;
pub mod registry;
pub mod versions;

mod reaper;
pub use reaper::Reaper;
