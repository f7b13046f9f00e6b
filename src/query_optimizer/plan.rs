//! Query plan trees
//!
//! A plan is an owned tree of [`PlanNode`]s. Every node owns its inputs, so a
//! node lives in exactly one place of exactly one tree. Rewrites never edit a
//! node; they build new nodes over existing or cloned inputs.

use super::{Attribute, NamedRelation, Predicate, Relation};
use crate::{Error, Result};
use std::fmt;

/// Relational-algebra operators
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Read a base relation
    Scan { relation: NamedRelation },
    /// Keep the tuples satisfying an equality predicate
    Select {
        input: Box<PlanNode>,
        predicate: Predicate,
    },
    /// Restrict the output to a list of attributes
    Project {
        input: Box<PlanNode>,
        attributes: Vec<Attribute>,
    },
    /// Cartesian product
    Product {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    /// Equi-join on an attribute of each input
    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        predicate: Predicate,
    },
}

/// An operator plus the output schema the estimator computed for it
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    operator: Operator,
    output: Option<Relation>,
}

/// Handler invoked on every node of a plan, inputs before parents
pub trait PlanVisitor {
    fn visit(&mut self, node: &mut PlanNode) -> Result<()>;
}

impl PlanNode {
    fn from_operator(operator: Operator) -> Self {
        Self {
            operator,
            output: None,
        }
    }

    pub fn scan(relation: NamedRelation) -> Self {
        Self::from_operator(Operator::Scan { relation })
    }

    pub fn select(input: PlanNode, predicate: Predicate) -> Self {
        Self::from_operator(Operator::Select {
            input: Box::new(input),
            predicate,
        })
    }

    pub fn project(input: PlanNode, attributes: Vec<Attribute>) -> Self {
        Self::from_operator(Operator::Project {
            input: Box::new(input),
            attributes,
        })
    }

    pub fn product(left: PlanNode, right: PlanNode) -> Self {
        Self::from_operator(Operator::Product {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn join(left: PlanNode, right: PlanNode, predicate: Predicate) -> Self {
        Self::from_operator(Operator::Join {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Output schema, present once the node has been estimated
    pub fn output(&self) -> Option<&Relation> {
        self.output.as_ref()
    }

    /// Output schema, or a consistency violation if the node was never estimated
    pub fn require_output(&self) -> Result<&Relation> {
        self.output.as_ref().ok_or_else(|| {
            Error::consistency(format!("{} node has no computed output schema", self.kind()))
        })
    }

    pub(crate) fn set_output(&mut self, output: Relation) {
        self.output = Some(output);
    }

    pub fn kind(&self) -> &'static str {
        match self.operator {
            Operator::Scan { .. } => "Scan",
            Operator::Select { .. } => "Select",
            Operator::Project { .. } => "Project",
            Operator::Product { .. } => "Product",
            Operator::Join { .. } => "Join",
        }
    }

    /// Child nodes, left to right
    pub fn inputs(&self) -> Vec<&PlanNode> {
        match &self.operator {
            Operator::Scan { .. } => vec![],
            Operator::Select { input, .. } | Operator::Project { input, .. } => vec![&**input],
            Operator::Product { left, right } | Operator::Join { left, right, .. } => {
                vec![&**left, &**right]
            }
        }
    }

    /// Post-order depth-first traversal: every input is visited before the
    /// node itself, so a handler always sees its inputs' output schemas.
    pub fn accept<V: PlanVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        match &mut self.operator {
            Operator::Scan { .. } => {}
            Operator::Select { input, .. } | Operator::Project { input, .. } => {
                input.accept(visitor)?;
            }
            Operator::Product { left, right } | Operator::Join { left, right, .. } => {
                left.accept(visitor)?;
                right.accept(visitor)?;
            }
        }
        visitor.visit(self)
    }

    /// Read-only post-order traversal
    pub fn walk<F: FnMut(&PlanNode)>(&self, f: &mut F) {
        for input in self.inputs() {
            input.walk(f);
        }
        f(self);
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operator {
            Operator::Scan { relation } => write!(f, "{}", relation.name()),
            Operator::Select { input, predicate } => {
                write!(f, "SELECT [{}] ({})", predicate, input)
            }
            Operator::Project { input, attributes } => {
                let names: Vec<&str> = attributes.iter().map(|a| a.name()).collect();
                write!(f, "PROJECT [{}] ({})", names.join(","), input)
            }
            Operator::Product { left, right } => write!(f, "({}) TIMES ({})", left, right),
            Operator::Join {
                left,
                right,
                predicate,
            } => write!(f, "({}) JOIN [{}] ({})", left, predicate, right),
        }
    }
}
