//! relopt - cost-based planning core for a relational query engine
//!
//! Features:
//! - Cardinality and distinct-value estimation for every plan node
//! - Selection and projection pushdown
//! - Exhaustive join-order search scored by total materialized tuples

pub mod catalog;
pub mod error;
pub mod logging;
pub mod query_optimizer;

pub use catalog::Catalogue;
pub use error::{Error, Result};
pub use query_optimizer::{
    explain, Attribute, AttributeMatching, CanonicalQuery, Estimator, JoinRounding,
    NamedRelation, Operator, Optimizer, OptimizerConfig, PlanNode, PlanVisitor, Predicate,
    Relation,
};
