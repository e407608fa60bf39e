pub mod api;
pub mod jar;
pub mod login;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod validate;

pub use jar::{CookieJar, CookieRecord};
pub use login::{LoginDriver, LoginFn, LoginState};
pub use registry::{SiteBinding, SiteRegistry};
pub use scheduler::{CookieScheduler, CookieSchedulerConfig};
pub use store::{CredentialStore, RedisCredentialStore};
pub use validate::{CookieValidator, HttpValidator};
