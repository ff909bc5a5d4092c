use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Value, ValueId};

/// An immutable pairing of a value with its offset into an arena
#[derive(Debug, Clone)]
pub struct Allocation {
    value: ValueId,
    name: String,
    offset: usize,
    size: usize,
}

impl Allocation {
    pub fn value(&self) -> ValueId {
        self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Element count, equal to the referenced value's size
    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the last element covered by this allocation
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Mapping from value identity to its allocation within one arena
#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    allocations: HashMap<ValueId, Allocation>,
}

impl MemoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a value at the current end of the arena and return its offset
    pub fn append(&mut self, value: &Value) -> usize {
        let offset = self.total_size();
        self.append_at(value, offset);
        offset
    }

    /// Place a value at an explicit offset. Re-appending the same value
    /// overwrites its previous allocation.
    pub fn append_at(&mut self, value: &Value, offset: usize) {
        self.allocations.insert(
            value.id,
            Allocation {
                value: value.id,
                name: value.name.clone(),
                offset,
                size: value.size,
            },
        );
    }

    pub fn get(&self, id: ValueId) -> Option<&Allocation> {
        self.allocations.get(&id)
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.allocations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.values()
    }

    /// Arena size in elements, recomputed on demand from the allocations
    pub fn total_size(&self) -> usize {
        self.allocations
            .values()
            .map(|a| a.offset + a.size)
            .max()
            .unwrap_or(0)
    }

    /// Projection used to hand the layout to stages that do not share
    /// in-process objects with the planner
    pub fn summary(&self) -> LayoutSummary {
        LayoutSummary {
            total_size: self.total_size(),
            allocation: self
                .allocations
                .values()
                .map(|a| {
                    (
                        a.name.clone(),
                        AllocationSummary {
                            name: a.name.clone(),
                            offset: a.offset,
                            size: a.size,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Serializable form of a single allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

/// Serializable form of a whole layout, keyed by value name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub total_size: usize,
    pub allocation: BTreeMap<String, AllocationSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Graph;

    #[test]
    fn test_append_places_at_end() {
        let mut graph = Graph::new();
        let a = graph.add_variable("a", 4);
        let b = graph.add_variable("b", 6);

        let mut layout = MemoryLayout::new();
        assert_eq!(layout.append(graph.value(a)), 0);
        assert_eq!(layout.append(graph.value(b)), 4);
        assert_eq!(layout.total_size(), 10);
    }

    #[test]
    fn test_reappend_overwrites() {
        let mut graph = Graph::new();
        let a = graph.add_variable("a", 4);

        let mut layout = MemoryLayout::new();
        layout.append_at(graph.value(a), 0);
        layout.append_at(graph.value(a), 16);

        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get(a).unwrap().offset(), 16);
        assert_eq!(layout.total_size(), 20);
    }

    #[test]
    fn test_total_size_is_max_end_not_sum() {
        let mut graph = Graph::new();
        let a = graph.add_variable("a", 4);
        let b = graph.add_variable("b", 4);

        let mut layout = MemoryLayout::new();
        layout.append_at(graph.value(a), 0);
        layout.append_at(graph.value(b), 0);

        assert_eq!(layout.total_size(), 4);
    }
}
