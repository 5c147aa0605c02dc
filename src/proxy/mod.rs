//! Proxy and upstream endpoint knowledge shared across modules.
//!
//! Lookups never hit the upstream services directly; every request URL is the
//! proxy prefix followed by the full upstream URL.

pub mod registry;
