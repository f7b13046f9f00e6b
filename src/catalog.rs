//! System catalogue
//!
//! Directory of named relations and attributes, indexed by name. Statistics
//! (tuple counts, distinct-value counts) live on the relations and attributes
//! themselves; the catalogue only resolves names. Every handle it returns is an
//! owned copy, so later declarations never alter plans that were already built.

use crate::query_optimizer::{Attribute, NamedRelation};
use crate::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct Catalogue {
    relations: HashMap<String, NamedRelation>,
    /// Bare attribute name -> most recently declared attribute of that name
    attributes: HashMap<String, Attribute>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a relation with `tuple_count` tuples and no attributes.
    ///
    /// Redeclaring drops the relation's previous attributes from bare-name lookup.
    pub fn declare_relation(&mut self, name: &str, tuple_count: u64) -> NamedRelation {
        self.attributes.retain(|_, attribute| attribute.relation() != Some(name));
        let relation = NamedRelation::new(name, tuple_count);
        self.relations.insert(name.to_string(), relation.clone());
        relation
    }

    /// Declare an attribute with `distinct_values` distinct values and attach it
    /// to the relation named `relation`
    pub fn declare_attribute(
        &mut self,
        relation: &str,
        name: &str,
        distinct_values: u64,
    ) -> Result<Attribute> {
        let owner = self
            .relations
            .get_mut(relation)
            .ok_or_else(|| Error::RelationNotFound(relation.to_string()))?;
        let attribute = Attribute::scoped(relation, name, distinct_values);
        owner.add_attribute(attribute.clone());
        self.attributes.insert(name.to_string(), attribute.clone());
        Ok(attribute)
    }

    pub fn lookup_relation(&self, name: &str) -> Result<NamedRelation> {
        self.relations
            .get(name)
            .cloned()
            .ok_or_else(|| Error::RelationNotFound(name.to_string()))
    }

    pub fn lookup_attribute(&self, name: &str) -> Result<Attribute> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))
    }

    /// Resolve `name` within one relation, bypassing name-only conflation
    pub fn lookup_qualified_attribute(&self, relation: &str, name: &str) -> Result<Attribute> {
        let owner = self
            .relations
            .get(relation)
            .ok_or_else(|| Error::RelationNotFound(relation.to_string()))?;
        owner
            .schema()
            .attributes()
            .iter()
            .find(|a| a.name() == name)
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound(format!("{}.{}", relation, name)))
    }

    /// Declared relation names in sorted order
    pub fn relation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("Person", 400);
        catalogue.declare_attribute("Person", "persid", 400).unwrap();
        catalogue.declare_attribute("Person", "persname", 350).unwrap();

        let person = catalogue.lookup_relation("Person").unwrap();
        assert_eq!(person.schema().tuple_count(), 400);
        assert_eq!(person.schema().attribute_names(), vec!["persid", "persname"]);

        let persid = catalogue.lookup_attribute("persid").unwrap();
        assert_eq!(persid.value_count(), 400);
        assert_eq!(persid.relation(), Some("Person"));
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let mut catalogue = Catalogue::new();
        assert!(matches!(
            catalogue.lookup_relation("Nope"),
            Err(Error::RelationNotFound(name)) if name == "Nope"
        ));
        assert!(matches!(
            catalogue.lookup_attribute("nope"),
            Err(Error::AttributeNotFound(_))
        ));
        assert!(matches!(
            catalogue.declare_attribute("Nope", "a", 1),
            Err(Error::RelationNotFound(_))
        ));
    }

    #[test]
    fn test_bare_name_resolves_to_latest_declaration() {
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("R", 10);
        catalogue.declare_relation("S", 20);
        catalogue.declare_attribute("R", "id", 10).unwrap();
        catalogue.declare_attribute("S", "id", 5).unwrap();

        assert_eq!(catalogue.lookup_attribute("id").unwrap().relation(), Some("S"));
        let qualified = catalogue.lookup_qualified_attribute("R", "id").unwrap();
        assert_eq!(qualified.value_count(), 10);
        assert!(catalogue.lookup_qualified_attribute("R", "missing").is_err());
    }

    #[test]
    fn test_redeclared_relation_forgets_attributes() {
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("R", 10);
        catalogue.declare_attribute("R", "a", 5).unwrap();
        catalogue.declare_relation("S", 20);
        catalogue.declare_attribute("S", "b", 4).unwrap();

        catalogue.declare_relation("R", 30);
        assert!(matches!(
            catalogue.lookup_attribute("a"),
            Err(Error::AttributeNotFound(_))
        ));
        assert!(catalogue.lookup_qualified_attribute("R", "a").is_err());
        assert_eq!(catalogue.lookup_attribute("b").unwrap().value_count(), 4);

        catalogue.declare_attribute("R", "a", 7).unwrap();
        assert_eq!(catalogue.lookup_attribute("a").unwrap().value_count(), 7);
        assert_eq!(catalogue.lookup_relation("R").unwrap().schema().tuple_count(), 30);
    }

    #[test]
    fn test_handles_are_snapshots() {
        let mut catalogue = Catalogue::new();
        let before = catalogue.declare_relation("R", 10);
        catalogue.declare_attribute("R", "A", 2).unwrap();
        assert!(before.schema().attributes().is_empty());
        assert_eq!(catalogue.lookup_relation("R").unwrap().schema().attributes().len(), 1);
        assert_eq!(catalogue.relation_names(), vec!["R"]);
    }
}
