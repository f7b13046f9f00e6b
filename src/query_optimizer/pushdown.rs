//! Selection and projection pushdown

use super::{Attribute, Estimator, OptimizerConfig, PlanNode, PlanSummary, Predicate};
use crate::{Error, Result};
use tracing::debug;

/// One filtered subtree per base relation, plus the predicates left to join them
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPlan {
    pub subtrees: Vec<PlanNode>,
    /// Attribute predicates spanning two relations, in declaration order
    pub join_predicates: Vec<Predicate>,
    pub projection: Option<Vec<Attribute>>,
}

/// Filtered subtrees trimmed to the attributes the rest of the plan needs
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPlan {
    pub subtrees: Vec<PlanNode>,
    pub join_predicates: Vec<Predicate>,
    pub projection: Option<Vec<Attribute>>,
}

/// Build a chain of selects directly above every scan.
///
/// Value predicates are applied to every scan exposing their attribute, in
/// declaration order. Attribute predicates whose two sides both belong to one
/// scan are then applied to the first such scan and never become joins.
pub fn push_selections(summary: &PlanSummary, config: &OptimizerConfig) -> Result<FilteredPlan> {
    let matching = config.attribute_matching;
    let mut estimator = Estimator::with_config(config);
    let mut join_predicates = summary.attribute_predicates.clone();
    let mut applied = vec![false; summary.value_predicates.len()];
    let mut subtrees = Vec::with_capacity(summary.scans.len());

    for relation in &summary.scans {
        let schema = relation.schema();
        let mut node = PlanNode::scan(relation.clone());
        estimator.annotate(&mut node)?;

        for (i, predicate) in summary.value_predicates.iter().enumerate() {
            if schema.contains(predicate.left_attribute(), matching) {
                node = PlanNode::select(node, predicate.clone());
                estimator.annotate(&mut node)?;
                applied[i] = true;
            }
        }

        let mut remaining = Vec::with_capacity(join_predicates.len());
        for predicate in join_predicates {
            let local = predicate
                .attributes()
                .iter()
                .all(|a| schema.contains(a, matching));
            if local {
                node = PlanNode::select(node, predicate);
                estimator.annotate(&mut node)?;
            } else {
                remaining.push(predicate);
            }
        }
        join_predicates = remaining;

        debug!(relation = relation.name(), plan = %node, "pushed selections");
        subtrees.push(node);
    }

    if let Some(i) = applied.iter().position(|done| !done) {
        return Err(Error::consistency(format!(
            "predicate {} matches no relation in the plan",
            summary.value_predicates[i]
        )));
    }

    Ok(FilteredPlan {
        subtrees,
        join_predicates,
        projection: summary.projection.clone(),
    })
}

/// Project every subtree onto the attributes still referenced above it.
///
/// Needed attributes are those of the remaining join predicates and of the
/// root projection. Without a root projection every attribute is part of the
/// result, so nothing is trimmed.
pub fn push_projections(filtered: FilteredPlan, config: &OptimizerConfig) -> Result<ProjectedPlan> {
    let FilteredPlan {
        subtrees,
        join_predicates,
        projection,
    } = filtered;

    if projection.is_none() {
        return Ok(ProjectedPlan {
            subtrees,
            join_predicates,
            projection,
        });
    }
    let projected = projection.as_deref().unwrap_or_default();

    let matching = config.attribute_matching;
    let mut required: Vec<&Attribute> = Vec::new();
    let referenced = join_predicates
        .iter()
        .flat_map(|p| p.attributes())
        .chain(projected.iter());
    for attribute in referenced {
        if !required.iter().any(|r| matching.matches(r, attribute)) {
            required.push(attribute);
        }
    }

    let mut estimator = Estimator::with_config(config);
    let mut trimmed = Vec::with_capacity(subtrees.len());
    for subtree in subtrees {
        let keep: Vec<Attribute> = subtree
            .require_output()?
            .attributes()
            .iter()
            .filter(|a| required.iter().any(|r| matching.matches(a, r)))
            .cloned()
            .collect();

        if keep.is_empty() {
            trimmed.push(subtree);
        } else {
            let mut node = PlanNode::project(subtree, keep);
            estimator.annotate(&mut node)?;
            trimmed.push(node);
        }
    }

    Ok(ProjectedPlan {
        subtrees: trimmed,
        join_predicates,
        projection,
    })
}
