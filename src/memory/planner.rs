use std::collections::HashSet;

use log::debug;
use ndarray::Array1;

use crate::error::{Error, Result};
use crate::memory::constants::ConstantPacker;
use crate::memory::layout::MemoryLayout;
use crate::memory::variables::VariableAllocator;
use crate::model::{Graph, NodeId, ValueId};

/// Complete memory plan for one graph: two independent layouts plus the
/// materialized constant buffer
#[derive(Debug, Clone)]
pub struct MemoryPlan {
    /// Layout of the reusable variable arena
    pub variables: MemoryLayout,
    /// Layout of the packed constant arena
    pub constants: MemoryLayout,
    /// Constant arena contents, zero outside any allocation
    pub constant_data: Array1<f32>,
}

/// Entry point that splits a graph's values into constants and variables
/// and drives both allocators
pub struct MemoryPlanner;

impl MemoryPlanner {
    /// Compute the memory plan for a graph.
    ///
    /// Collects every reachable value with aliases resolved, renames the
    /// values to sequential synthetic names in visitation order, and hands
    /// the constant and variable partitions to their allocators. Renaming
    /// mutates the graph's values, so planning is a one-shot operation on
    /// a given graph.
    pub fn plan(graph: &mut Graph) -> Result<MemoryPlan> {
        let order = graph.topological_order()?;
        let values = Self::collect_values(graph, &order);
        Self::assign_names(graph, &values)?;

        let (constants, variables): (Vec<ValueId>, Vec<ValueId>) = values
            .iter()
            .copied()
            .partition(|&id| graph.value(id).is_constant());
        debug!(
            "planning {} values: {} constants, {} variables",
            values.len(),
            constants.len(),
            variables.len()
        );

        let (constants_layout, constant_data) = ConstantPacker::pack(graph, &constants)?;
        let variables_layout = VariableAllocator::allocate(graph, &order, &variables)?;

        Ok(MemoryPlan {
            variables: variables_layout,
            constants: constants_layout,
            constant_data,
        })
    }

    /// Enumerate every reachable value exactly once, aliases resolved to
    /// their originals. Graph inputs come first, then each operator's
    /// inputs and outputs in topological order, so the visitation order is
    /// reproducible for an unchanged graph.
    fn collect_values(graph: &Graph, order: &[NodeId]) -> Vec<ValueId> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();

        for &input in &graph.inputs {
            let id = graph.resolve(input);
            if seen.insert(id) {
                values.push(id);
            }
        }

        for &node_id in order {
            let node = graph.node(node_id);
            for value in node.input_values().chain(node.output_values()) {
                let id = graph.resolve(value);
                if seen.insert(id) {
                    values.push(id);
                }
            }
        }

        values
    }

    /// Give every collected value a fresh sequential name so merged
    /// subgraphs cannot collide in the serialized projection
    fn assign_names(graph: &mut Graph, values: &[ValueId]) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, &id) in values.iter().enumerate() {
            if !seen.insert(id) {
                return Err(Error::DuplicateValue(graph.value(id).name.clone()));
            }
            graph.value_mut(id).name = format!("v{}", index);
        }
        Ok(())
    }
}
