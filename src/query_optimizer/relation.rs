//! Schema objects shared by the estimator and the optimizer
//!
//! A [`Relation`] is a tuple count plus an ordered attribute list; it is the
//! only statistic the cost model works with. Base relations are wrapped in a
//! [`NamedRelation`] by the catalogue, intermediate ones are produced by the
//! [`Estimator`](super::Estimator).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named column with an estimated number of distinct values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
    /// Owning relation, when the attribute was declared against one
    relation: Option<String>,
    value_count: u64,
}

impl Attribute {
    /// Create an attribute that belongs to no particular relation
    pub fn new(name: impl Into<String>, value_count: u64) -> Self {
        Self {
            name: name.into(),
            relation: None,
            value_count,
        }
    }

    /// Create an attribute owned by `relation`
    pub fn scoped(relation: impl Into<String>, name: impl Into<String>, value_count: u64) -> Self {
        Self {
            name: name.into(),
            relation: Some(relation.into()),
            value_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    /// `relation.name` when scoped, otherwise the bare name
    pub fn qualified_name(&self) -> String {
        match &self.relation {
            Some(relation) => format!("{}.{}", relation, self.name),
            None => self.name.clone(),
        }
    }

    pub(crate) fn with_value_count(&self, value_count: u64) -> Self {
        Self {
            name: self.name.clone(),
            relation: self.relation.clone(),
            value_count,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// How two attributes are decided to be "the same attribute"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMatching {
    /// Names alone decide identity; same-named attributes of different
    /// relations are conflated
    #[default]
    NameOnly,
    /// Identity is `(owning relation, name)`
    Qualified,
}

impl AttributeMatching {
    pub fn matches(self, a: &Attribute, b: &Attribute) -> bool {
        match self {
            AttributeMatching::NameOnly => a.name == b.name,
            AttributeMatching::Qualified => a.name == b.name && a.relation == b.relation,
        }
    }
}

/// Tuple count and attribute list of a base or intermediate result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    tuple_count: u64,
    attributes: Vec<Attribute>,
}

impl Relation {
    pub(crate) fn new(tuple_count: u64) -> Self {
        Self {
            tuple_count,
            attributes: Vec::new(),
        }
    }

    pub(crate) fn with_attributes(tuple_count: u64, attributes: Vec<Attribute>) -> Self {
        Self {
            tuple_count,
            attributes,
        }
    }

    pub(crate) fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn tuple_count(&self) -> u64 {
        self.tuple_count
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Find the schema's copy of `target`
    pub fn find(&self, target: &Attribute, matching: AttributeMatching) -> Option<&Attribute> {
        self.attributes.iter().find(|a| matching.matches(a, target))
    }

    pub fn contains(&self, target: &Attribute, matching: AttributeMatching) -> bool {
        self.find(target, matching).is_some()
    }

    /// Like [`Relation::find`], but a missing attribute is a consistency violation
    pub fn attribute(&self, target: &Attribute, matching: AttributeMatching) -> Result<&Attribute> {
        self.find(target, matching).ok_or_else(|| {
            Error::consistency(format!(
                "attribute {} is not part of schema [{}]",
                target.qualified_name(),
                self.attribute_names().join(",")
            ))
        })
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name()).collect()
    }
}

/// A base relation declared in the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRelation {
    name: String,
    schema: Relation,
}

impl NamedRelation {
    pub(crate) fn new(name: impl Into<String>, tuple_count: u64) -> Self {
        Self {
            name: name.into(),
            schema: Relation::new(tuple_count),
        }
    }

    pub(crate) fn add_attribute(&mut self, attribute: Attribute) {
        self.schema.add_attribute(attribute);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Relation {
        &self.schema
    }
}

/// Equality predicate used by Select and Join
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `attribute = "value"`
    Value { attribute: Attribute, value: String },
    /// `left = right`
    Attributes { left: Attribute, right: Attribute },
}

impl Predicate {
    pub fn equals_value(attribute: Attribute, value: impl Into<String>) -> Self {
        Predicate::Value {
            attribute,
            value: value.into(),
        }
    }

    pub fn equals_attribute(left: Attribute, right: Attribute) -> Self {
        Predicate::Attributes { left, right }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Predicate::Value { .. })
    }

    pub fn left_attribute(&self) -> &Attribute {
        match self {
            Predicate::Value { attribute, .. } => attribute,
            Predicate::Attributes { left, .. } => left,
        }
    }

    pub fn right_attribute(&self) -> Option<&Attribute> {
        match self {
            Predicate::Value { .. } => None,
            Predicate::Attributes { right, .. } => Some(right),
        }
    }

    /// Every attribute the predicate references, left first
    pub fn attributes(&self) -> Vec<&Attribute> {
        match self {
            Predicate::Value { attribute, .. } => vec![attribute],
            Predicate::Attributes { left, right } => vec![left, right],
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Value { attribute, value } => write!(f, "{}=\"{}\"", attribute, value),
            Predicate::Attributes { left, right } => write!(f, "{}={}", left, right),
        }
    }
}
