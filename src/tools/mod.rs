pub mod calculate;
pub mod collections_score;
pub mod credit_score;
pub mod document_search;
pub mod factory;
pub mod registry;
pub mod regulation_lookup;
pub mod traits;

pub use calculate::CalculateTool;
pub use collections_score::CollectionsScoreTool;
pub use credit_score::CreditScoreTool;
pub use document_search::DocumentSearchTool;
pub use factory::default_registry;
pub use registry::ToolRegistry;
pub use regulation_lookup::RegulationLookupTool;
pub use traits::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolResult, ToolSpec};
