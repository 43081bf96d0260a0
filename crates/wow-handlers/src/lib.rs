//! Per-tool validators, the handler registry, and the decision router.

pub mod bash;
pub mod content;
pub mod context;
pub mod fastpath;
pub mod files;
pub mod handler;
pub mod read;
pub mod router;
pub mod search;
pub mod task;
pub mod tiers;
pub mod web;

pub use context::GatewayContext;
pub use handler::{HandlerRegistry, ToolHandler, default_registry};
pub use router::route;
pub use tiers::{PathClass, PathTier, classify_path};
