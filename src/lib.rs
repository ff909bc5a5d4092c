pub mod error;
pub mod memory;
pub mod model;

// Re-export commonly used types
pub use error::{Error, Result};
pub use memory::{
    Allocation, AllocationSummary, LayoutSummary, MemoryLayout, MemoryPlan, MemoryPlanner,
};
pub use model::{Graph, Node, NodeId, Value, ValueId, ValueKind};
