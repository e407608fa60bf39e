pub mod cookie;
pub mod core;
pub mod proxy;

// --- Primary core exports ---
pub use crate::core::config;
pub use crate::core::error::StoreError;
pub use crate::core::USER_AGENT;

// --- Pool services ---
pub use cookie::{CookieScheduler, CookieSchedulerConfig, SiteRegistry};
pub use proxy::{default_sources, ProxyScheduler, ProxySchedulerConfig};
