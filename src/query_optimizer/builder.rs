//! Canonical plan construction
//!
//! Turns a select-project-join query given by names into the unoptimized plan
//! the optimizer expects: a left-deep product of scans, one select per
//! predicate above it, and an optional projection at the root.
//!
//! Queries can be written as
//!
//! ```text
//! SELECT projname,deptname FROM Person,Project WHERE persid=manager,persname="Smith"
//! ```
//!
//! where `*` selects every attribute, predicates are separated by commas and a
//! double-quoted right-hand side is a literal. A `relation.attribute` name
//! resolves within that relation only.

use super::{Attribute, PlanNode, Predicate};
use crate::catalog::Catalogue;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Equality predicate given by attribute names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedPredicate {
    Value { attribute: String, value: String },
    Attributes { left: String, right: String },
}

/// A select-project-join query given by names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalQuery {
    /// Relations in FROM order
    pub relations: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<NamedPredicate>,
    /// Projected attributes; `None` keeps every attribute
    #[serde(default)]
    pub projection: Option<Vec<String>>,
}

impl NamedPredicate {
    pub fn resolve(&self, catalogue: &Catalogue) -> Result<Predicate> {
        match self {
            NamedPredicate::Value { attribute, value } => Ok(Predicate::equals_value(
                resolve_attribute(catalogue, attribute)?,
                value.clone(),
            )),
            NamedPredicate::Attributes { left, right } => Ok(Predicate::equals_attribute(
                resolve_attribute(catalogue, left)?,
                resolve_attribute(catalogue, right)?,
            )),
        }
    }
}

impl CanonicalQuery {
    /// Parse `SELECT <attrs|*> FROM <relations> [WHERE <predicates>]`
    pub fn parse(text: &str) -> Result<Self> {
        // Runs of whitespace collapse to one space, quoted values included.
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let upper = text.to_ascii_uppercase();

        if !upper.starts_with("SELECT ") {
            return Err(Error::Query(format!("expected SELECT in {:?}", text)));
        }
        let from_at = upper
            .find(" FROM ")
            .ok_or_else(|| Error::Query(format!("expected FROM in {:?}", text)))?;
        let where_at = upper[from_at..].find(" WHERE ").map(|i| i + from_at);

        let select_list = text["SELECT ".len()..from_at].trim();
        let from_list = &text[from_at + " FROM ".len()..where_at.unwrap_or(text.len())];

        let projection = if select_list == "*" {
            None
        } else {
            Some(split_names(select_list, "SELECT")?)
        };
        let relations = split_names(from_list, "FROM")?;
        let predicates = match where_at {
            Some(at) => split_outside_quotes(&text[at + " WHERE ".len()..])
                .into_iter()
                .map(parse_predicate)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            relations,
            predicates,
            projection,
        })
    }

    /// Build the canonical unoptimized plan, resolving names through `catalogue`
    pub fn build(&self, catalogue: &Catalogue) -> Result<PlanNode> {
        let mut relations = self.relations.iter();
        let first = relations
            .next()
            .ok_or_else(|| Error::Query("query names no relation".to_string()))?;

        let mut plan = PlanNode::scan(catalogue.lookup_relation(first)?);
        for name in relations {
            plan = PlanNode::product(plan, PlanNode::scan(catalogue.lookup_relation(name)?));
        }
        for predicate in &self.predicates {
            plan = PlanNode::select(plan, predicate.resolve(catalogue)?);
        }
        if let Some(names) = &self.projection {
            let attributes = names
                .iter()
                .map(|name| resolve_attribute(catalogue, name))
                .collect::<Result<Vec<Attribute>>>()?;
            plan = PlanNode::project(plan, attributes);
        }
        Ok(plan)
    }
}

fn resolve_attribute(catalogue: &Catalogue, name: &str) -> Result<Attribute> {
    match name.split_once('.') {
        Some((relation, attribute)) => catalogue.lookup_qualified_attribute(relation, attribute),
        None => catalogue.lookup_attribute(name),
    }
}

fn split_names(list: &str, clause: &str) -> Result<Vec<String>> {
    let names: Vec<String> = list
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();
    if names.iter().any(String::is_empty) {
        return Err(Error::Query(format!("empty name in {} list {:?}", clause, list)));
    }
    Ok(names)
}

fn split_outside_quotes(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts
}

fn parse_predicate(text: &str) -> Result<NamedPredicate> {
    let (left, right) = text
        .split_once('=')
        .ok_or_else(|| Error::Query(format!("expected '=' in predicate {:?}", text)))?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return Err(Error::Query(format!("incomplete predicate {:?}", text)));
    }

    if right.len() >= 2 && right.starts_with('"') && right.ends_with('"') {
        Ok(NamedPredicate::Value {
            attribute: left.to_string(),
            value: right[1..right.len() - 1].to_string(),
        })
    } else {
        Ok(NamedPredicate::Attributes {
            left: left.to_string(),
            right: right.to_string(),
        })
    }
}
