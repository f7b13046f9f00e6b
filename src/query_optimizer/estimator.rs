//! Cardinality and cost estimation
//!
//! The estimator walks a plan bottom-up and attaches an output [`Relation`] to
//! every node. With `T(x)` the tuple count of a schema and `V(x, a)` the
//! distinct-value count of attribute `a` in it:
//!
//! * scan: the base relation unchanged
//! * project: `T(child)`, restricted to the projected attributes
//! * select `a = v`: `ceil(T / V(a))`, and `V(a)` becomes 1
//! * select `a = b`: `ceil(T / max(V(a), V(b)))`, both become `min(V(a), V(b))`
//! * product: `T(l) * T(r)`, attributes concatenated
//! * join `a = b`: `T(l) * T(r) / max(V(l, a), V(r, b))`, both become the min
//!
//! The cost of a plan is the sum of the output tuple counts of all its nodes.

use super::{
    AttributeMatching, JoinRounding, Operator, OptimizerConfig, PlanNode, PlanVisitor, Predicate,
    Relation,
};
use super::{Attribute, NamedRelation};
use crate::{Error, Result};

/// Plan visitor computing output schemas and the running total cost
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    cost: u64,
    matching: AttributeMatching,
    join_rounding: JoinRounding,
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &OptimizerConfig) -> Self {
        Self {
            cost: 0,
            matching: config.attribute_matching,
            join_rounding: config.join_rounding,
        }
    }

    /// Estimate every node of `plan` from scratch and return the total cost.
    ///
    /// Schemas left on the nodes by an earlier pass are recomputed.
    pub fn estimate(&mut self, plan: &mut PlanNode) -> Result<u64> {
        self.cost = 0;
        plan.accept(self)?;
        Ok(self.cost)
    }

    /// Attach output schemas to every node of `plan`, discarding the cost
    pub fn annotate(&mut self, plan: &mut PlanNode) -> Result<()> {
        self.estimate(plan).map(|_| ())
    }

    /// Cost accumulated by the last estimation pass
    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn matching(&self) -> AttributeMatching {
        self.matching
    }

    fn scan(&self, relation: &NamedRelation) -> Relation {
        let base = relation.schema();
        Relation::with_attributes(base.tuple_count(), base.attributes().to_vec())
    }

    fn project(&self, input: &Relation, attributes: &[Attribute]) -> Result<Relation> {
        let projected = attributes
            .iter()
            .map(|a| input.attribute(a, self.matching).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Relation::with_attributes(input.tuple_count(), projected))
    }

    fn select(&self, input: &Relation, predicate: &Predicate) -> Result<Relation> {
        match predicate {
            Predicate::Value { attribute, .. } => {
                let selected = input.attribute(attribute, self.matching)?;
                let values = nonzero(selected)?;
                let mut output = Relation::new(input.tuple_count().div_ceil(values));
                for a in input.attributes() {
                    if self.matching.matches(a, attribute) {
                        output.add_attribute(a.with_value_count(1));
                    } else {
                        output.add_attribute(a.clone());
                    }
                }
                Ok(output)
            }
            Predicate::Attributes { left, right } => {
                let left_values = nonzero(input.attribute(left, self.matching)?)?;
                let right_values = nonzero(input.attribute(right, self.matching)?)?;
                let shared = left_values.min(right_values);
                let mut output =
                    Relation::new(input.tuple_count().div_ceil(left_values.max(right_values)));
                for a in input.attributes() {
                    if self.matching.matches(a, left) || self.matching.matches(a, right) {
                        output.add_attribute(a.with_value_count(shared));
                    } else {
                        output.add_attribute(a.clone());
                    }
                }
                Ok(output)
            }
        }
    }

    fn product(&self, left: &Relation, right: &Relation) -> Result<Relation> {
        let tuples = checked_product(left, right)?;
        let mut attributes = left.attributes().to_vec();
        attributes.extend_from_slice(right.attributes());
        Ok(Relation::with_attributes(tuples, attributes))
    }

    fn join(&self, left: &Relation, right: &Relation, predicate: &Predicate) -> Result<Relation> {
        let Predicate::Attributes {
            left: first,
            right: second,
        } = predicate
        else {
            return Err(Error::consistency(format!(
                "join predicate {} must compare two attributes",
                predicate
            )));
        };

        // The predicate may name the right input's attribute first.
        let (left_attr, right_attr) =
            if left.contains(first, self.matching) && right.contains(second, self.matching) {
                (first, second)
            } else if left.contains(second, self.matching) && right.contains(first, self.matching)
            {
                (second, first)
            } else {
                return Err(Error::consistency(format!(
                    "join predicate {} does not span inputs [{}] and [{}]",
                    predicate,
                    left.attribute_names().join(","),
                    right.attribute_names().join(",")
                )));
            };

        let left_values = nonzero(left.attribute(left_attr, self.matching)?)?;
        let right_values = nonzero(right.attribute(right_attr, self.matching)?)?;
        let shared = left_values.min(right_values);
        let tuples = self
            .join_rounding
            .divide(checked_product(left, right)?, left_values.max(right_values));

        let mut output = Relation::new(tuples);
        for a in left.attributes() {
            if self.matching.matches(a, left_attr) {
                output.add_attribute(a.with_value_count(shared));
            } else {
                output.add_attribute(a.clone());
            }
        }
        for a in right.attributes() {
            if self.matching.matches(a, right_attr) {
                output.add_attribute(a.with_value_count(shared));
            } else {
                output.add_attribute(a.clone());
            }
        }
        Ok(output)
    }
}

impl PlanVisitor for Estimator {
    fn visit(&mut self, node: &mut PlanNode) -> Result<()> {
        let output = match node.operator() {
            Operator::Scan { relation } => self.scan(relation),
            Operator::Project { input, attributes } => {
                self.project(input.require_output()?, attributes)?
            }
            Operator::Select { input, predicate } => {
                self.select(input.require_output()?, predicate)?
            }
            Operator::Product { left, right } => {
                self.product(left.require_output()?, right.require_output()?)?
            }
            Operator::Join {
                left,
                right,
                predicate,
            } => self.join(left.require_output()?, right.require_output()?, predicate)?,
        };
        self.cost = self
            .cost
            .checked_add(output.tuple_count())
            .ok_or_else(|| Error::consistency("total plan cost overflows u64"))?;
        node.set_output(output);
        Ok(())
    }
}

fn nonzero(attribute: &Attribute) -> Result<u64> {
    match attribute.value_count() {
        0 => Err(Error::consistency(format!(
            "attribute {} has a distinct-value count of zero",
            attribute.qualified_name()
        ))),
        n => Ok(n),
    }
}

fn checked_product(left: &Relation, right: &Relation) -> Result<u64> {
    left.tuple_count()
        .checked_mul(right.tuple_count())
        .ok_or_else(|| Error::consistency("cardinality overflows u64"))
}
