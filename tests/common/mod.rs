#![allow(dead_code)]

use relopt::{Catalogue, Estimator, PlanNode};

/// Declare a relation and its attributes in one call
pub fn declare(catalogue: &mut Catalogue, name: &str, tuples: u64, attributes: &[(&str, u64)]) {
    catalogue.declare_relation(name, tuples);
    for (attribute, distinct) in attributes {
        catalogue
            .declare_attribute(name, attribute, *distinct)
            .expect("relation was just declared");
    }
}

/// `R(A, B)` and `S(B, C)` sharing the attribute name `B`
pub fn shared_name_catalogue() -> Catalogue {
    let mut catalogue = Catalogue::new();
    declare(&mut catalogue, "R", 100, &[("A", 10), ("B", 50)]);
    declare(&mut catalogue, "S", 200, &[("B", 20), ("C", 100)]);
    catalogue
}

pub fn company_catalogue() -> Catalogue {
    let mut catalogue = Catalogue::new();
    declare(
        &mut catalogue,
        "Person",
        400,
        &[("persid", 400), ("persname", 350), ("age", 47)],
    );
    declare(
        &mut catalogue,
        "Project",
        40,
        &[("projid", 40), ("projname", 35), ("dept", 5)],
    );
    declare(
        &mut catalogue,
        "Department",
        5,
        &[("deptid", 5), ("deptname", 5), ("manager", 5)],
    );
    catalogue
}

pub fn estimate(plan: &mut PlanNode) -> u64 {
    Estimator::new()
        .estimate(plan)
        .expect("plan should be estimable")
}

pub fn output_names(plan: &PlanNode) -> Vec<String> {
    plan.output()
        .expect("plan should be annotated")
        .attributes()
        .iter()
        .map(|a| a.name().to_string())
        .collect()
}

pub fn sorted_output_names(plan: &PlanNode) -> Vec<String> {
    let mut names = output_names(plan);
    names.sort();
    names
}
