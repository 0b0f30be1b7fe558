//! Overlay identity filter.
//!
//! 1. **Decision** (`decision`): raw remote address -> `AccessOutcome`
//! 2. **Resolution** (`resolver`): LocalAPI `whois` lookup behind `IdentityResolver`
//! 3. **Propagation** (`propagate`): identity attributes into `RequestVars`
//! 4. **Adapter** (`layer`): Tower layer wiring the above into an HTTP stack

pub mod config;
pub mod decision;
pub mod layer;
pub mod outcome;
pub mod propagate;
pub mod resolver;

pub use config::{LocalApiConfig, ResolutionMode, TsidConfig};
pub use decision::{AccessDecision, DECISIONS_METRIC};
pub use layer::{RemoteAddr, TsidLayer, TsidService, FILTER_NAME};
pub use outcome::{AccessError, AccessOutcome, DenyReason, ResolveError};
pub use propagate::IdentityPropagator;
pub use resolver::LocalApiResolver;
