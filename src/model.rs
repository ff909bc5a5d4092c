use std::collections::{HashMap, VecDeque};

use ndarray::ArrayD;

use crate::error::{Error, Result};

/// Unique identifier for a value in the graph
pub type ValueId = usize;

/// Unique identifier for an operator node in the graph
pub type NodeId = usize;

/// What kind of storage a value represents
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// Computed at run time, placed in the variable arena
    Variable,
    /// Materialized data, placed in the constant arena
    Constant { data: ArrayD<f32> },
    /// Transparent stand-in for another value, never allocated itself
    Alias { original: ValueId },
}

/// A named, sized tensor-producing entity in the graph
#[derive(Debug, Clone)]
pub struct Value {
    pub id: ValueId,
    pub name: String,
    /// Element count
    pub size: usize,
    pub kind: ValueKind,
}

impl Value {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant { .. })
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.kind, ValueKind::Alias { .. })
    }

    /// Materialized data for constants, `None` for other kinds
    pub fn constant_data(&self) -> Option<&ArrayD<f32>> {
        match &self.kind {
            ValueKind::Constant { data } => Some(data),
            _ => None,
        }
    }
}

/// Operator node with named input and output ports
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<(String, ValueId)>,
    pub outputs: Vec<(String, ValueId)>,
}

impl Node {
    /// Whether this operator is a pure shape-only transform whose output
    /// may share its input's storage
    pub fn is_passthrough(&self) -> bool {
        matches!(self.op_type.as_str(), "Flatten" | "Reshape")
    }

    pub fn input_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.inputs.iter().map(|(_, id)| *id)
    }

    pub fn output_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.outputs.iter().map(|(_, id)| *id)
    }
}

/// Dataflow graph over an arena of values and operator nodes
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub values: Vec<Value>,
    pub nodes: Vec<Node>,
    /// Graph-level input values, live before any operator runs
    pub inputs: Vec<ValueId>,
    /// Graph-level output values
    pub outputs: Vec<ValueId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run-time computed value
    pub fn add_variable(&mut self, name: &str, size: usize) -> ValueId {
        self.push_value(name, size, ValueKind::Variable)
    }

    /// Add a constant value carrying materialized data
    pub fn add_constant(&mut self, name: &str, size: usize, data: ArrayD<f32>) -> ValueId {
        self.push_value(name, size, ValueKind::Constant { data })
    }

    /// Add an alias to an existing value
    pub fn add_alias(&mut self, name: &str, original: ValueId) -> ValueId {
        let size = self.values[original].size;
        self.push_value(name, size, ValueKind::Alias { original })
    }

    fn push_value(&mut self, name: &str, size: usize, kind: ValueKind) -> ValueId {
        let id = self.values.len();
        self.values.push(Value {
            id,
            name: name.to_string(),
            size,
            kind,
        });
        id
    }

    /// Add an operator node with named input and output ports
    pub fn add_node(
        &mut self,
        name: &str,
        op_type: &str,
        inputs: Vec<(&str, ValueId)>,
        outputs: Vec<(&str, ValueId)>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            op_type: op_type.to_string(),
            inputs: inputs
                .into_iter()
                .map(|(port, v)| (port.to_string(), v))
                .collect(),
            outputs: outputs
                .into_iter()
                .map(|(port, v)| (port.to_string(), v))
                .collect(),
        });
        id
    }

    /// Mark a value as a graph-level input
    pub fn mark_input(&mut self, id: ValueId) {
        self.inputs.push(id);
    }

    /// Mark a value as a graph-level output
    pub fn mark_output(&mut self, id: ValueId) {
        self.outputs.push(id);
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Follow alias links to the original value. Aliases always refer to
    /// previously created values, so the chain terminates.
    pub fn resolve(&self, id: ValueId) -> ValueId {
        let mut current = id;
        while let ValueKind::Alias { original } = &self.values[current].kind {
            current = *original;
        }
        current
    }

    /// Number of consuming edges per resolved value across the whole graph
    pub fn consumer_counts(&self) -> HashMap<ValueId, usize> {
        let mut counts = HashMap::new();
        for node in &self.nodes {
            for input in node.input_values() {
                *counts.entry(self.resolve(input)).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Sort nodes topologically using Kahn's algorithm
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        // Identify the producer of each resolved value
        let mut producers: HashMap<ValueId, NodeId> = HashMap::new();
        for node in &self.nodes {
            for output in node.output_values() {
                producers.insert(self.resolve(output), node.id);
            }
        }

        // Build the graph edges and count in-degrees
        let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        let mut in_degree: Vec<usize> = vec![0; self.nodes.len()];
        for node in &self.nodes {
            for input in node.input_values() {
                if let Some(&producer) = producers.get(&self.resolve(input)) {
                    adjacency[producer].push(node.id);
                    in_degree[node.id] += 1;
                }
                // A value without a producer is a graph input or a constant
            }
        }

        // Seed with nodes that have no dependencies, in id order so the
        // resulting order is reproducible
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for node in &self.nodes {
            if in_degree[node.id] == 0 {
                queue.push_back(node.id);
            }
        }

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop_front() {
            sorted.push(node_id);
            for &consumer in &adjacency[node_id] {
                in_degree[consumer] -= 1;
                if in_degree[consumer] == 0 {
                    queue.push_back(consumer);
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            return Err(Error::InvalidGraph(format!(
                "Cycle detected: only {} of {} nodes could be ordered",
                sorted.len(),
                self.nodes.len()
            )));
        }

        Ok(sorted)
    }
}
