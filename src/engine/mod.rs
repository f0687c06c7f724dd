pub mod events;
pub mod loop_;
pub mod prompt;
pub mod protocol;

pub use events::{EngineEvent, StepEvent, StepStatus, StepType, sanitize_value, truncate_chars};
pub use loop_::{DEFAULT_MAX_ITERATIONS, Engine, RunParams};
pub use prompt::{build_system_prompt, corrective_message};
pub use protocol::{ModelTurn, ToolCall, decode};
