//! Deferred permission checks.
//!
//! A policy that cannot decide without the resource answers with a
//! [`Criteria`] tree of [`Condition`]s: named, parameterized rule
//! invocations combined with AND/OR. The service that owns the resource
//! interprets that tree with its [`RuleRegistry`], either by evaluating it
//! against one resource ([`RuleRegistry::apply`]) or by lowering it into its
//! own query type ([`RuleRegistry::to_query`]).
//!
//! The `server` feature adds the HTTP resolution endpoint, settings and
//! telemetry; the `client` feature adds the caller side of the same protocol.

mod error;
mod evaluate;
pub mod parse;
mod types;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod endpoint;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod settings;
#[cfg(feature = "server")]
pub mod telemetry;

pub use error::Error;
pub use parse::ParseError;
pub use types::{
    ApplyConditionsRequest, ApplyConditionsResponse, AuthorizeQuery, Condition,
    ConditionFactory, ConditionalDecision, Criteria, ErasedRule, ErrorDetail, ErrorResponse,
    PermissionPolicy, PermissionRule, PolicyDecision, ResolveFiltersRequest, RuleDescription,
    RuleError, RuleRegistry, RuleRegistryBuilder, APPLY_CONDITIONS_PATH, RESOLVE_FILTERS_PATH,
};

#[cfg(feature = "client")]
pub use client::{ClientError, ResolutionClient};
#[cfg(feature = "server")]
pub use endpoint::{PermissionIntegration, ResolutionError, ResourceFetcher};
#[cfg(feature = "server")]
pub use settings::Settings;
