use super::calculate::CalculateTool;
use super::collections_score::CollectionsScoreTool;
use super::credit_score::CreditScoreTool;
use super::document_search::DocumentSearchTool;
use super::registry::ToolRegistry;
use super::regulation_lookup::RegulationLookupTool;

/// Build the registry with every built-in tool. Per-agent allow-lists narrow
/// this set at run time; the registry itself always carries the full set.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CreditScoreTool::new()));
    registry.register(Box::new(CollectionsScoreTool::new()));
    registry.register(Box::new(RegulationLookupTool::new()));
    registry.register(Box::new(CalculateTool::new()));
    registry.register(Box::new(DocumentSearchTool::new()));
    registry
}
