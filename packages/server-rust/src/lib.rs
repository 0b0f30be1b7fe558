//! `tsid` Server — Tailscale identity filter for Tower/axum HTTP stacks.
//!
//! Requests from outside the tailnet are refused; requests from tailnet
//! members carry the owning user's identity in [`tsid_core::RequestVars`].

pub mod access;
pub mod network;
pub mod traits;

pub use access::{AccessDecision, AccessOutcome, TsidConfig, TsidLayer};
pub use traits::IdentityResolver;
