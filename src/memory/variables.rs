use std::collections::HashMap;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::memory::free_list::FreeList;
use crate::memory::layout::MemoryLayout;
use crate::model::{Graph, Node, NodeId, ValueId};

/// Assigns offsets to intermediate values by walking the graph in
/// topological order, reusing released blocks best-fit and aliasing
/// pass-through outputs onto their input's storage
pub struct VariableAllocator;

impl VariableAllocator {
    /// Build the variable-arena layout for exactly the values in
    /// `variables`.
    ///
    /// Every graph input is seeded at the arena end before any operator
    /// runs. Each operator then has its outputs placed before its inputs
    /// are released, matching execution semantics: an operator's inputs
    /// stay live until its outputs exist. A value's retain count is set to
    /// its fan-out when it is produced and decremented once per consuming
    /// edge; at zero the block returns to the free list and coalesces with
    /// its neighbors. Values with no consumers are never released.
    pub fn allocate(
        graph: &Graph,
        order: &[NodeId],
        variables: &[ValueId],
    ) -> Result<MemoryLayout> {
        let mut layout = MemoryLayout::new();
        let mut free = FreeList::new();
        let fan_out = graph.consumer_counts();
        let mut retain: HashMap<ValueId, usize> = HashMap::new();
        // Pass-through output -> value owning the shared allocation
        let mut backing: HashMap<ValueId, ValueId> = HashMap::new();

        // Graph inputs must be valid before any operator runs, so they are
        // pinned at the arena end rather than drawn from the free list
        for &input in &graph.inputs {
            let id = graph.resolve(input);
            if graph.value(id).is_constant() || layout.contains(id) {
                continue;
            }
            let offset = layout.append(graph.value(id));
            retain.insert(id, fan_out.get(&id).copied().unwrap_or(0));
            trace!("seeded input {} at offset {}", graph.value(id).name, offset);
        }

        for &node_id in order {
            let node = graph.node(node_id);

            for output in node.output_values() {
                let id = graph.resolve(output);
                let value = graph.value(id);
                if value.is_constant() || layout.contains(id) {
                    continue;
                }
                let out_fan = fan_out.get(&id).copied().unwrap_or(0);

                if let Some(source) = Self::passthrough_source(graph, node, &fan_out, &layout) {
                    // Share the input's block instead of allocating. The
                    // shared block must stay live until both consumer
                    // chains are done, so the owner absorbs this output's
                    // fan-out. Chained pass-throughs resolve to the owner
                    // of the actual allocation.
                    let shared_offset = layout
                        .get(source)
                        .ok_or_else(|| Error::UnallocatedValue(graph.value(source).name.clone()))?
                        .offset();
                    layout.append_at(value, shared_offset);

                    let owner = backing.get(&source).copied().unwrap_or(source);
                    backing.insert(id, owner);
                    let count = retain
                        .get_mut(&owner)
                        .ok_or_else(|| Error::UnallocatedValue(graph.value(owner).name.clone()))?;
                    *count += out_fan;
                    trace!(
                        "{} shares offset {} with {}",
                        value.name,
                        shared_offset,
                        graph.value(owner).name
                    );
                } else {
                    match free.take_best_fit(value.size) {
                        Some(offset) => {
                            layout.append_at(value, offset);
                            trace!("{} reuses free block at offset {}", value.name, offset);
                        }
                        None => {
                            let offset = layout.append(value);
                            trace!("{} grows arena to offset {}", value.name, offset);
                        }
                    }
                    retain.insert(id, out_fan);
                }
            }

            for input in node.input_values() {
                let id = graph.resolve(input);
                if graph.value(id).is_constant() {
                    continue;
                }
                let owner = backing.get(&id).copied().unwrap_or(id);
                let count = retain
                    .get_mut(&owner)
                    .ok_or_else(|| Error::UnallocatedValue(graph.value(owner).name.clone()))?;
                if *count == 0 {
                    return Err(Error::InvalidGraph(format!(
                        "retain count underflow for value {} at node {}",
                        graph.value(owner).name,
                        node.name
                    )));
                }
                *count -= 1;

                if *count == 0 {
                    let allocation = layout
                        .get(owner)
                        .ok_or_else(|| Error::UnallocatedValue(graph.value(owner).name.clone()))?;
                    free.release(allocation.offset(), allocation.size());
                }
            }
        }

        if layout.len() != variables.len() {
            return Err(Error::InvalidGraph(format!(
                "variable layout covers {} values, expected {}",
                layout.len(),
                variables.len()
            )));
        }

        debug!(
            "allocated {} variables in {} elements ({} free blocks left)",
            layout.len(),
            layout.total_size(),
            free.len()
        );
        Ok(layout)
    }

    /// The input whose block a pass-through operator's output may share,
    /// if the sharing is safe.
    ///
    /// Sharing is only safe when the pass-through operator is the sole
    /// consumer of its input: with further consumers around, a downstream
    /// in-place mutation of the shared block would corrupt what they read.
    /// In that case the output falls back to a fresh allocation.
    fn passthrough_source(
        graph: &Graph,
        node: &Node,
        fan_out: &HashMap<ValueId, usize>,
        layout: &MemoryLayout,
    ) -> Option<ValueId> {
        if !node.is_passthrough() || node.inputs.len() != 1 {
            return None;
        }
        let source = graph.resolve(node.inputs[0].1);
        if graph.value(source).is_constant() {
            return None;
        }
        if fan_out.get(&source).copied().unwrap_or(0) != 1 {
            return None;
        }
        if !layout.contains(source) {
            return None;
        }
        Some(source)
    }
}
