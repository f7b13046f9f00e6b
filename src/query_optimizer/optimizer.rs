//! Plan rewriting
//!
//! [`Optimizer::optimize`] takes a plan in canonical form (scans combined by
//! products, filtered by selects, at most one project at the root) and returns
//! an equivalent plan whose estimated cost is no higher. It runs four phases,
//! each a pure function over the previous phase's snapshot:
//!
//! 1. [`classify`] collects the scans, predicates and root projection
//! 2. [`push_selections`] builds one filtered subtree per scan
//! 3. [`push_projections`] trims each subtree to the attributes still needed
//! 4. [`search_join_order`] tries every join-predicate ordering
//!
//! The input plan is never modified.

use super::{
    push_projections, push_selections, search_join_order, Attribute, Estimator, NamedRelation,
    Operator, OptimizerConfig, PlanNode, Predicate,
};
use crate::{Error, Result};
use tracing::{debug, info};

/// Everything the rewrite needs to know about a canonical plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    /// Base relations, one per name, in the order first reached
    pub scans: Vec<NamedRelation>,
    /// `attribute = value` predicates in declaration order
    pub value_predicates: Vec<Predicate>,
    /// `attribute = attribute` predicates in declaration order
    pub attribute_predicates: Vec<Predicate>,
    /// Attributes of the root projection, if the plan has one
    pub projection: Option<Vec<Attribute>>,
}

/// Collect the scans, predicates and root projection of a canonical plan.
///
/// Nodes are visited inputs first, so predicates closest to the scans (the
/// first ones written) come first. A join already present in the plan
/// contributes its predicate to the join search like any other.
pub fn classify(plan: &PlanNode) -> Result<PlanSummary> {
    let mut summary = PlanSummary {
        scans: Vec::new(),
        value_predicates: Vec::new(),
        attribute_predicates: Vec::new(),
        projection: None,
    };
    collect(plan, true, &mut summary)?;
    Ok(summary)
}

fn collect(node: &PlanNode, is_root: bool, summary: &mut PlanSummary) -> Result<()> {
    for input in node.inputs() {
        collect(input, false, summary)?;
    }

    match node.operator() {
        Operator::Scan { relation } => {
            if !summary.scans.iter().any(|s| s.name() == relation.name()) {
                summary.scans.push(relation.clone());
            }
        }
        Operator::Select { predicate, .. } => {
            let bucket = if predicate.is_value() {
                &mut summary.value_predicates
            } else {
                &mut summary.attribute_predicates
            };
            if !bucket.contains(predicate) {
                bucket.push(predicate.clone());
            }
        }
        Operator::Project { attributes, .. } => {
            if !is_root {
                return Err(Error::consistency(
                    "projection below the root of an unoptimized plan",
                ));
            }
            summary.projection = Some(attributes.clone());
        }
        Operator::Product { .. } => {}
        Operator::Join { predicate, .. } => {
            if predicate.is_value() {
                return Err(Error::consistency(format!(
                    "join predicate {} must compare two attributes",
                    predicate
                )));
            }
            debug!(predicate = %predicate, "join in unoptimized plan reordered as a predicate");
            if !summary.attribute_predicates.contains(predicate) {
                summary.attribute_predicates.push(predicate.clone());
            }
        }
    }
    Ok(())
}

/// Cost-based plan rewriter
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Rewrite `plan` into an equivalent plan of equal or lower estimated cost.
    ///
    /// Every node of the returned plan carries its output schema.
    pub fn optimize(&self, plan: &PlanNode) -> Result<PlanNode> {
        let summary = classify(plan)?;
        debug!(
            scans = summary.scans.len(),
            value_predicates = summary.value_predicates.len(),
            attribute_predicates = summary.attribute_predicates.len(),
            projected = summary.projection.is_some(),
            "classified plan"
        );

        let filtered = push_selections(&summary, &self.config)?;
        debug!(
            subtrees = filtered.subtrees.len(),
            join_predicates = filtered.join_predicates.len(),
            "pushed selections"
        );

        let projected = push_projections(filtered, &self.config)?;
        let search = search_join_order(&projected, &self.config)?;
        info!(
            cost = search.cost,
            orderings = search.candidate_costs.len(),
            "selected join order"
        );

        match summary.projection {
            Some(attributes) => {
                let mut best = PlanNode::project(search.plan, attributes);
                Estimator::with_config(&self.config).annotate(&mut best)?;
                Ok(best)
            }
            None => Ok(search.plan),
        }
    }
}
