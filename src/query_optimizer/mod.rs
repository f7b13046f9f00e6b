//! Cost-Based Query Optimizer
//!
//! This module implements the planning core of the engine:
//! - Plan trees of scan, select, project, product and join operators
//! - A cardinality estimator that annotates every node with its output schema
//!   and scores a plan by the sum of its nodes' output sizes
//! - An optimizer that pushes selections and projections towards the scans and
//!   searches every ordering of the join predicates for the cheapest join chain
//!
//! ## Pipeline
//!
//! ```text
//! CanonicalQuery
//!   → CanonicalQuery::build() → PlanNode (products, selects, project)
//!   → classify() → PlanSummary
//!   → push_selections() → FilteredPlan
//!   → push_projections() → ProjectedPlan
//!   → search_join_order() → JoinSearch
//!   → Optimizer::optimize() → PlanNode (optimized, annotated)
//! ```

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod estimator;
pub mod explain;
pub mod join_order;
pub mod optimizer;
pub mod plan;
pub mod pushdown;
pub mod relation;

pub use builder::{CanonicalQuery, NamedPredicate};
pub use estimator::Estimator;
pub use explain::explain;
pub use join_order::{search_join_order, JoinSearch};
pub use optimizer::{classify, Optimizer, PlanSummary};
pub use plan::{Operator, PlanNode, PlanVisitor};
pub use pushdown::{push_projections, push_selections, FilteredPlan, ProjectedPlan};
pub use relation::{Attribute, AttributeMatching, NamedRelation, Predicate, Relation};

/// Rounding applied to the join cardinality `T(l) * T(r) / max(V(l, a), V(r, b))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRounding {
    /// Round up, like selections do
    #[default]
    Ceiling,
    /// Plain integer division
    Truncate,
}

impl JoinRounding {
    pub fn divide(self, numerator: u64, denominator: u64) -> u64 {
        match self {
            JoinRounding::Ceiling => numerator.div_ceil(denominator),
            JoinRounding::Truncate => numerator / denominator,
        }
    }
}

/// Query optimization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// How attributes are identified across schemas
    pub attribute_matching: AttributeMatching,
    /// Rounding of join cardinalities
    pub join_rounding: JoinRounding,
    /// Largest number of join predicates the exhaustive search accepts
    pub max_join_predicates: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            attribute_matching: AttributeMatching::NameOnly,
            join_rounding: JoinRounding::Ceiling,
            max_join_predicates: 8,
        }
    }
}
