mod analysis;
mod calendar;
mod config;
mod error;
mod platform;
mod repository;
mod stats;

#[cfg(feature = "client")]
mod aggregator;
#[cfg(feature = "client")]
pub mod bitbucket;
#[cfg(feature = "client")]
pub mod github;
#[cfg(feature = "client")]
pub mod gitlab;
#[cfg(feature = "client")]
mod http;
#[cfg(feature = "client")]
pub mod metrics;
#[cfg(feature = "client")]
pub mod reconciler;
#[cfg(feature = "client")]
mod service;

pub use analysis::*;
pub use calendar::*;
pub use config::*;
pub use error::*;
pub use platform::*;
pub use repository::*;
pub use stats::*;

#[cfg(feature = "client")]
pub use aggregator::*;
#[cfg(feature = "client")]
pub use service::*;
