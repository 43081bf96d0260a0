//! Core types shared by every gateway crate: tool requests, decisions,
//! the error enum, the in-process event bus, and the risk assessor.

pub mod bus;
pub mod error;
pub mod risk;
pub mod types;

pub use bus::{BusEvent, EventBus, SubscriberId};
pub use error::GatewayError;
pub use risk::{RiskFactors, RiskLevel};
pub use types::{Decision, HookOutput, Outcome, ToolArgs, ToolName, ToolRequest};
