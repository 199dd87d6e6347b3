//! Synchronization client for a rate limited, eventually consistent remote
//! spreadsheet service.
//!
//! The [`client::SheetClient`] is the single entry point: it owns one rate
//! limiter per traffic class (read and write quotas are independent on the
//! remote side), retries transient failures through
//! [`rate_limit::RetryPolicy`] and keeps every tab it appends to below a
//! configured row ceiling by evicting the oldest rows first.

pub mod api;
pub mod arguments;
pub mod block;
pub mod client;
pub mod error;
pub mod http_client;
pub mod range;
