//! Relays GitHub push and pull request webhooks to team chat webhooks.

pub mod config;
pub mod dispatch;
pub mod event;
pub mod format;
pub mod notify;
pub mod resolver;
pub mod server;

pub use config::{Config, ConfigError, ConfigStore};
pub use dispatch::{DispatchError, Dispatcher, IgnoreReason, Outcome};
pub use notify::{Notify, TransportError, WebhookNotifier};
pub use resolver::{Destination, DestinationTable};
