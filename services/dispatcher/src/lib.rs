pub mod access;
pub mod api;
pub mod authz;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod interaction;
pub mod platform;
pub mod router;
pub mod tenant;

pub use access::AccessLevelResolver;
pub use api::{create_router, AppState, ErrorResponse, Registrar};
pub use authz::{AuthorizationChain, Denial, DenialAudit};
pub use diagnostics::{
    ChannelDiagnosticSink, DiagnosticKind, DiagnosticRecord, DiagnosticSink, TracingDiagnosticSink,
};
pub use interaction::InteractionEnvelope;
pub use router::{
    AckHandle, AckSource, CommandHandler, DispatchOutcome, DispatchRegistry, HandlerContext,
    InteractionRouter, RouterSettings, SharedHandler,
};
pub use tenant::{ConfigError, ConfigStore, StoreError, TenantConfig, TenantConfigCache};
