//! EXPLAIN output formatting
//!
//! One node per line, inputs indented below their parent, with the estimated
//! tuple count of every node that has been annotated.

use super::{Operator, PlanNode};
use std::fmt::Write;

/// Format a plan as an indented tree
pub fn explain(plan: &PlanNode) -> String {
    let mut output = String::new();
    format_node(plan, 0, &mut output);
    output
}

fn format_node(plan: &PlanNode, indent: usize, out: &mut String) {
    let prefix = "  ".repeat(indent);
    let label = match plan.operator() {
        Operator::Scan { relation } => format!("Scan: {}", relation.name()),
        Operator::Select { predicate, .. } => format!("Select: {}", predicate),
        Operator::Project { attributes, .. } => {
            let names: Vec<&str> = attributes.iter().map(|a| a.name()).collect();
            format!("Project: [{}]", names.join(", "))
        }
        Operator::Product { .. } => "Product".to_string(),
        Operator::Join { predicate, .. } => format!("Join: {}", predicate),
    };

    match plan.output() {
        Some(schema) => {
            writeln!(out, "{}{} (rows={})", prefix, label, schema.tuple_count()).unwrap()
        }
        None => writeln!(out, "{}{}", prefix, label).unwrap(),
    }

    for input in plan.inputs() {
        format_node(input, indent + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogue;
    use crate::query_optimizer::{CanonicalQuery, Estimator};

    #[test]
    fn test_explain_annotated_plan() {
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("R", 100);
        catalogue.declare_attribute("R", "a", 10).unwrap();
        catalogue.declare_relation("S", 20);
        catalogue.declare_attribute("S", "b", 4).unwrap();

        let mut plan = CanonicalQuery::parse("SELECT a FROM R,S WHERE a=\"1\"")
            .unwrap()
            .build(&catalogue)
            .unwrap();
        assert_eq!(
            explain(&plan),
            "Project: [a]\n  Select: a=\"1\"\n    Product\n      Scan: R\n      Scan: S\n"
        );

        Estimator::new().estimate(&mut plan).unwrap();
        assert_eq!(
            explain(&plan),
            "Project: [a] (rows=200)\n  Select: a=\"1\" (rows=200)\n    Product (rows=2000)\n      Scan: R (rows=100)\n      Scan: S (rows=20)\n"
        );
    }
}
