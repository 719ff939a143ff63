//! AI Council Core Library
//!
//! Lets one conversation thread be answered by several AI backends, either
//! side by side in isolation (compare) or in turn, each seeing the others
//! (debate).

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod message;
pub mod mode;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod strategy;

pub use backend::{Backend, BackendProfile};
pub use config::{Config, default_config};
pub use error::{CouncilError, ProviderError};
pub use filter::ContextFilter;
pub use message::{BackendId, Message, Transcript};
pub use mode::{Mode, ModeCommand, ModeState, extract_inline_mode};
pub use orchestrator::{CouncilEvent, CouncilOrchestrator, CouncilRequest, EventCallback};
pub use registry::BackendRegistry;
pub use strategy::{InvocationResult, ModeStrategy, RunContext};
