pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

pub use agent_engine::engine::AgentEngine;
pub use agent_engine::state::{FinishReason, RunOutcome};
pub use config::{load_config, AppConfig};
pub use errors::{PilotError, PilotResult};
pub use executor::actions::ActionExecutor;
pub use executor::desktop::{Desktop, NativeDesktop};
pub use llm::provider::ChatEndpoint;
pub use llm::providers::openai_compatible::OpenAiCompatibleEndpoint;
