use ndarray::array;
use sylva::prelude::*;
use sylva_trees::{DecisionTree, Result};

fn main() -> Result<()> {
    // outlook (sunny, overcast, rain), humidity (normal, high), windy (no, yes)
    let records = array![
        [0., 1., 0.],
        [0., 1., 1.],
        [1., 1., 0.],
        [2., 1., 0.],
        [2., 0., 0.],
        [2., 0., 1.],
        [1., 0., 1.],
        [0., 1., 0.],
        [0., 0., 0.],
        [2., 0., 0.],
        [0., 0., 1.],
        [1., 1., 1.],
        [1., 0., 0.],
        [2., 1., MISSING],
    ];
    let play = array![0., 0., 1., 1., 1., 0., 1., 0., 1., 1., 1., 1., 1., 0.];

    let dataset =
        Dataset::new(records, play).with_feature_names(vec!["outlook", "humidity", "windy"]);
    let names = dataset.feature_names();

    println!("Training model with default params...");
    let model = DecisionTree::params().fit(&dataset)?;

    let cm = model.predict(&dataset).confusion_matrix(&dataset)?;
    println!("{}", cm);
    println!(
        "Training accuracy with {} nodes: {:.2}%",
        model.node_count(),
        100.0 * cm.accuracy()
    );

    // level order, indented by depth
    for node in model.iter_nodes() {
        let indent = "  ".repeat(node.depth());
        match node.split() {
            Some((_, feature, gain)) => {
                println!("{}split on {} (gain {:.3})", indent, names[feature], gain)
            }
            None => println!("{}predict {}", indent, node.prediction()),
        }
    }

    println!("Training model with pruning...");
    let pruned = DecisionTree::params().prune(true).train_ratio(0.7).fit(&dataset)?;
    if let Some(report) = pruned.prune_report() {
        println!(
            "Pruned {} nodes, validation accuracy {:.2} -> {:.2}",
            report.accepted.len(),
            report.baseline,
            report.accuracy
        );
    }

    Ok(())
}
