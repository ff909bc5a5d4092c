pub mod constants;
pub mod free_list;
pub mod layout;
pub mod planner;
pub mod variables;

pub use constants::ConstantPacker;
pub use free_list::FreeList;
pub use layout::{Allocation, AllocationSummary, LayoutSummary, MemoryLayout};
pub use planner::{MemoryPlan, MemoryPlanner};
pub use variables::VariableAllocator;
