//! Student profile: federated sign-in, profile load/submit, live record feed.

pub mod handlers;
pub mod service;
