//! Client side request throttling for remote APIs with per-class quotas.
//!
//! [`RateLimiter`] spaces admissions so the sustained request rate stays
//! below a configured budget and optionally bounds the number of in-flight
//! requests. [`RetryPolicy`] wraps remote calls and retries failures the
//! caller classifies as transient.

mod limiter;
mod retry;

pub use {
    limiter::{Permit, RateBudget, RateLimiter},
    retry::{RetryPolicy, RetrySpec},
};
