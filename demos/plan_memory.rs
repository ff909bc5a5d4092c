use ndarray::{ArrayD, IxDyn};

use memory_planner::{error::Result, Graph, MemoryPlanner, ValueId};

// A small convnet-shaped graph: conv + bias, flatten into a dense layer,
// with the feature map fanning out to a second head
fn build_demo_graph() -> (Graph, Vec<(&'static str, ValueId)>) {
    let mut graph = Graph::new();

    let image = graph.add_variable("image", 3 * 8 * 8);
    let kernel = graph.add_constant(
        "kernel",
        4 * 3 * 3 * 3,
        ArrayD::from_shape_vec(IxDyn(&[4, 3, 3, 3]), vec![0.5; 4 * 3 * 3 * 3]).unwrap(),
    );
    let bias = graph.add_constant(
        "bias",
        4,
        ArrayD::from_shape_vec(IxDyn(&[4]), vec![0.1, 0.2, 0.3, 0.4]).unwrap(),
    );
    let feature = graph.add_variable("feature", 4 * 6 * 6);
    let biased = graph.add_variable("biased", 4 * 6 * 6);
    let flat = graph.add_variable("flat", 4 * 6 * 6);
    let fc_weight = graph.add_constant(
        "fc_weight",
        10 * 4 * 6 * 6,
        ArrayD::from_shape_vec(IxDyn(&[10, 144]), vec![0.01; 10 * 144]).unwrap(),
    );
    let logits = graph.add_variable("logits", 10);
    let probs = graph.add_variable("probs", 10);

    graph.mark_input(image);
    graph.add_node(
        "conv",
        "Conv",
        vec![("x", image), ("w", kernel)],
        vec![("y", feature)],
    );
    graph.add_node(
        "add_bias",
        "Add",
        vec![("a", feature), ("b", bias)],
        vec![("out", biased)],
    );
    graph.add_node("flatten", "Flatten", vec![("in", biased)], vec![("out", flat)]);
    graph.add_node(
        "dense",
        "MatMul",
        vec![("x", flat), ("w", fc_weight)],
        vec![("y", logits)],
    );
    graph.add_node("softmax", "Softmax", vec![("in", logits)], vec![("out", probs)]);
    graph.mark_output(probs);

    let labels = vec![
        ("image", image),
        ("kernel", kernel),
        ("bias", bias),
        ("feature", feature),
        ("biased", biased),
        ("flat", flat),
        ("fc_weight", fc_weight),
        ("logits", logits),
        ("probs", probs),
    ];
    (graph, labels)
}

fn main() -> Result<()> {
    println!("Memory Planning Walkthrough");
    println!("---------------------------");

    let (mut graph, labels) = build_demo_graph();
    println!(
        "Built graph with {} values and {} operators",
        graph.values.len(),
        graph.nodes.len()
    );

    let plan = MemoryPlanner::plan(&mut graph)?;

    println!("\n1. Variable Arena");
    println!("-----------------");
    println!("Total size: {} elements", plan.variables.total_size());
    for (label, id) in &labels {
        if let Some(allocation) = plan.variables.get(*id) {
            println!(
                "  {:<10} ({}): offset={}, size={}",
                label,
                allocation.name(),
                allocation.offset(),
                allocation.size()
            );
        }
    }

    println!("\n2. Constant Arena");
    println!("-----------------");
    println!("Total size: {} elements", plan.constants.total_size());
    for (label, id) in &labels {
        if let Some(allocation) = plan.constants.get(*id) {
            println!(
                "  {:<10} ({}): offset={}, size={}",
                label,
                allocation.name(),
                allocation.offset(),
                allocation.size()
            );
        }
    }
    println!("Buffer holds {} elements", plan.constant_data.len());

    println!("\n3. Serialized Projection");
    println!("------------------------");
    let json = serde_json::to_string_pretty(&plan.variables.summary())?;
    println!("{}", json);

    Ok(())
}
