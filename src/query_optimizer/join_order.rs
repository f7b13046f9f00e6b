//! Exhaustive join-order search
//!
//! Every ordering of the join predicates is consumed greedily into a left-deep
//! chain: the first predicate joins the two subtrees exposing its attributes,
//! and each later predicate joins one more subtree onto the chain. The chain
//! with the lowest total cost wins; ties keep the ordering found first.
//!
//! An ordering that is not a connected sequence still yields a complete plan.
//! Predicates it cannot use as joins are skipped, any subtrees left in the
//! pool are attached with products, and the skipped predicates are applied as
//! selects on top. Such plans are equivalent but cost more, so they only win
//! when nothing better exists.
//!
//! The search visits `k!` orderings for `k` predicates, which is why
//! [`OptimizerConfig::max_join_predicates`] bounds `k`.

use super::{
    Attribute, AttributeMatching, Estimator, OptimizerConfig, PlanNode, PlanVisitor, Predicate,
    ProjectedPlan,
};
use crate::{Error, Result};
use tracing::{debug, trace};

/// Outcome of the join-order search
#[derive(Debug, Clone)]
pub struct JoinSearch {
    /// Cheapest plan found, fully annotated
    pub plan: PlanNode,
    /// Total estimated cost of `plan`
    pub cost: u64,
    /// Join predicates in the order that produced `plan`
    pub ordering: Vec<Predicate>,
    /// Cost of every ordering considered, in enumeration order
    pub candidate_costs: Vec<u64>,
}

pub fn search_join_order(projected: &ProjectedPlan, config: &OptimizerConfig) -> Result<JoinSearch> {
    let predicates = &projected.join_predicates;
    let subtrees = &projected.subtrees;

    if subtrees.is_empty() {
        return Err(Error::consistency("plan contains no scans"));
    }
    if predicates.len() > config.max_join_predicates {
        return Err(Error::JoinSearchLimit {
            predicates: predicates.len(),
            limit: config.max_join_predicates,
        });
    }
    check_resolvable(subtrees, predicates, config.attribute_matching)?;

    let mut estimator = Estimator::with_config(config);
    let mut order: Vec<usize> = (0..predicates.len()).collect();
    let mut candidate_costs = Vec::new();
    let mut best: Option<(PlanNode, u64, Vec<usize>)> = None;

    debug!(
        subtrees = subtrees.len(),
        predicates = predicates.len(),
        "searching join orders"
    );

    // With zero or one predicate there is a single ordering.
    loop {
        let ordered: Vec<&Predicate> = order.iter().map(|&i| &predicates[i]).collect();
        let mut plan = build_chain(subtrees, &ordered, &mut estimator)?;
        let cost = estimator.estimate(&mut plan)?;
        trace!(ordering = ?order, cost, "join order candidate");
        candidate_costs.push(cost);

        if best.as_ref().map_or(true, |(_, lowest, _)| cost < *lowest) {
            best = Some((plan, cost, order.clone()));
        }
        if !next_permutation(&mut order) {
            break;
        }
    }

    let (plan, cost, winner) =
        best.ok_or_else(|| Error::consistency("join search produced no candidate"))?;
    Ok(JoinSearch {
        plan,
        cost,
        ordering: winner.iter().map(|&i| predicates[i].clone()).collect(),
        candidate_costs,
    })
}

/// Every join attribute must be exposed by at least one subtree
fn check_resolvable(
    subtrees: &[PlanNode],
    predicates: &[Predicate],
    matching: AttributeMatching,
) -> Result<()> {
    for predicate in predicates {
        if predicate.is_value() {
            return Err(Error::consistency(format!(
                "join predicate {} must compare two attributes",
                predicate
            )));
        }
        for attribute in predicate.attributes() {
            if find_subtree(subtrees, attribute, matching, None)?.is_none() {
                return Err(Error::consistency(format!(
                    "join attribute {} is not produced by any relation",
                    attribute.qualified_name()
                )));
            }
        }
    }
    Ok(())
}

fn find_subtree(
    pool: &[PlanNode],
    attribute: &Attribute,
    matching: AttributeMatching,
    skip: Option<usize>,
) -> Result<Option<usize>> {
    for (i, node) in pool.iter().enumerate() {
        if Some(i) != skip && node.require_output()?.contains(attribute, matching) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Take the subtree exposing `left` and a different one exposing `right`
fn take_pair(
    pool: &mut Vec<PlanNode>,
    left: &Attribute,
    right: &Attribute,
    matching: AttributeMatching,
) -> Result<Option<(PlanNode, PlanNode)>> {
    let Some(l) = find_subtree(pool, left, matching, None)? else {
        return Ok(None);
    };
    let Some(r) = find_subtree(pool, right, matching, Some(l))? else {
        return Ok(None);
    };
    // Remove the higher index first so the lower one stays valid.
    let pair = if l < r {
        let right_node = pool.remove(r);
        (pool.remove(l), right_node)
    } else {
        let left_node = pool.remove(l);
        (left_node, pool.remove(r))
    };
    Ok(Some(pair))
}

/// Consume one predicate ordering into a complete, annotated plan
fn build_chain(
    subtrees: &[PlanNode],
    ordering: &[&Predicate],
    estimator: &mut Estimator,
) -> Result<PlanNode> {
    let matching = estimator.matching();
    let mut pool: Vec<PlanNode> = subtrees.to_vec();
    let mut chain: Option<PlanNode> = None;
    let mut skipped: Vec<&Predicate> = Vec::new();

    for &predicate in ordering {
        let left = predicate.left_attribute();
        let Some(right) = predicate.right_attribute() else {
            skipped.push(predicate);
            continue;
        };

        let mut node = match chain.take() {
            None => match take_pair(&mut pool, left, right, matching)? {
                Some((l, r)) => PlanNode::join(l, r, predicate.clone()),
                None => {
                    skipped.push(predicate);
                    continue;
                }
            },
            Some(current) => {
                let output = current.require_output()?;
                let has_left = output.contains(left, matching);
                let has_right = output.contains(right, matching);
                if has_left && has_right {
                    PlanNode::select(current, predicate.clone())
                } else {
                    let wanted = match (has_left, has_right) {
                        (true, _) => Some(right),
                        (_, true) => Some(left),
                        _ => None,
                    };
                    let found = match wanted {
                        Some(attribute) => find_subtree(&pool, attribute, matching, None)?,
                        None => None,
                    };
                    match found {
                        Some(i) => {
                            let other = pool.remove(i);
                            PlanNode::join(current, other, predicate.clone())
                        }
                        None => {
                            skipped.push(predicate);
                            chain = Some(current);
                            continue;
                        }
                    }
                }
            }
        };
        estimator.visit(&mut node)?;
        chain = Some(node);
    }

    let mut rest = pool.into_iter();
    let mut plan = match chain {
        Some(node) => node,
        None => rest
            .next()
            .ok_or_else(|| Error::consistency("join pool exhausted without a plan"))?,
    };
    for node in rest {
        plan = PlanNode::product(plan, node);
        estimator.visit(&mut plan)?;
    }
    for predicate in skipped {
        plan = PlanNode::select(plan, predicate.clone());
        estimator.visit(&mut plan)?;
    }
    Ok(plan)
}

/// Advance `order` to the next lexicographic permutation; false once exhausted
fn next_permutation(order: &mut [usize]) -> bool {
    if order.len() < 2 {
        return false;
    }
    let mut i = order.len() - 1;
    while i > 0 && order[i - 1] >= order[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = order.len() - 1;
    while order[j] <= order[i - 1] {
        j -= 1;
    }
    order.swap(i - 1, j);
    order[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogue;
    use crate::query_optimizer::{classify, push_projections, push_selections, CanonicalQuery};

    fn catalogue() -> Catalogue {
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("A", 1000);
        catalogue.declare_attribute("A", "a1", 100).unwrap();
        catalogue.declare_attribute("A", "a2", 10).unwrap();
        catalogue.declare_relation("B", 100);
        catalogue.declare_attribute("B", "b1", 100).unwrap();
        catalogue.declare_attribute("B", "b2", 50).unwrap();
        catalogue.declare_relation("C", 10);
        catalogue.declare_attribute("C", "c1", 10).unwrap();
        catalogue.declare_attribute("C", "c2", 5).unwrap();
        catalogue.declare_relation("D", 5000);
        catalogue.declare_attribute("D", "d1", 5000).unwrap();
        catalogue
    }

    fn projected(query: &str, config: &OptimizerConfig) -> ProjectedPlan {
        let plan = CanonicalQuery::parse(query)
            .unwrap()
            .build(&catalogue())
            .unwrap();
        let summary = classify(&plan).unwrap();
        let filtered = push_selections(&summary, config).unwrap();
        push_projections(filtered, config).unwrap()
    }

    #[test]
    fn test_next_permutation_is_lexicographic() {
        let mut order = vec![0, 1, 2];
        let mut seen = vec![order.clone()];
        while next_permutation(&mut order) {
            seen.push(order.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert!(!next_permutation(&mut []));
        assert!(!next_permutation(&mut [0]));
    }

    #[test]
    fn test_single_subtree_is_returned() {
        let config = OptimizerConfig::default();
        let search = search_join_order(&projected("SELECT * FROM A", &config), &config).unwrap();
        assert_eq!(search.plan.to_string(), "A");
        assert_eq!(search.cost, 1000);
        assert_eq!(search.candidate_costs, vec![1000]);
    }

    #[test]
    fn test_single_join() {
        let config = OptimizerConfig::default();
        let search =
            search_join_order(&projected("SELECT * FROM A,B WHERE a1=b1", &config), &config)
                .unwrap();
        assert_eq!(search.plan.to_string(), "(A) JOIN [a1=b1] (B)");
        assert_eq!(search.plan.output().unwrap().tuple_count(), 1000);
        assert_eq!(search.cost, 1000 + 100 + 1000);
        assert_eq!(search.candidate_costs.len(), 1);
    }

    #[test]
    fn test_no_predicates_builds_product() {
        let config = OptimizerConfig::default();
        let search = search_join_order(&projected("SELECT * FROM A,C", &config), &config).unwrap();
        assert_eq!(search.plan.to_string(), "(A) TIMES (C)");
        assert_eq!(search.plan.output().unwrap().tuple_count(), 10_000);
    }

    #[test]
    fn test_picks_cheapest_of_all_orderings() {
        let config = OptimizerConfig::default();
        let search = search_join_order(
            &projected("SELECT * FROM A,B,C WHERE a1=b1,b2=c2", &config),
            &config,
        )
        .unwrap();
        assert_eq!(search.candidate_costs.len(), 2);
        let lowest = search.candidate_costs.iter().copied().min().unwrap();
        assert_eq!(search.cost, lowest);
        // B joined with C first keeps the intermediate result small.
        assert_eq!(search.ordering[0].to_string(), "b2=c2");
        assert_eq!(
            search.plan.to_string(),
            "((B) JOIN [b2=c2] (C)) JOIN [a1=b1] (A)"
        );
    }

    #[test]
    fn test_equal_costs_keep_first_ordering() {
        // Two dimensions with identical statistics around one hub.
        let mut catalogue = Catalogue::new();
        catalogue.declare_relation("Hub", 1000);
        catalogue.declare_attribute("Hub", "x", 10).unwrap();
        catalogue.declare_attribute("Hub", "y", 10).unwrap();
        catalogue.declare_relation("P", 10);
        catalogue.declare_attribute("P", "px", 10).unwrap();
        catalogue.declare_relation("Q", 10);
        catalogue.declare_attribute("Q", "qy", 10).unwrap();

        let config = OptimizerConfig::default();
        let plan = CanonicalQuery::parse("SELECT * FROM Hub,P,Q WHERE x=px,y=qy")
            .unwrap()
            .build(&catalogue)
            .unwrap();
        let summary = classify(&plan).unwrap();
        let filtered = push_selections(&summary, &config).unwrap();
        let projected = push_projections(filtered, &config).unwrap();

        let search = search_join_order(&projected, &config).unwrap();
        assert_eq!(search.candidate_costs, vec![3020, 3020]);
        assert_eq!(search.cost, 3020);
        assert_eq!(search.ordering, projected.join_predicates);
        assert_eq!(
            search.plan.to_string(),
            "((Hub) JOIN [x=px] (P)) JOIN [y=qy] (Q)"
        );
    }

    #[test]
    fn test_disconnected_ordering_still_yields_complete_plan() {
        let config = OptimizerConfig::default();
        let projected = projected("SELECT * FROM A,B,C,D WHERE a1=b1,c1=d1,a2=c2", &config);
        let search = search_join_order(&projected, &config).unwrap();
        assert_eq!(search.candidate_costs.len(), 6);

        let expected: Vec<&str> = vec!["A", "B", "C", "D"];
        let mut scans = Vec::new();
        search.plan.walk(&mut |node| {
            if node.inputs().is_empty() {
                scans.push(node.to_string());
            }
        });
        scans.sort();
        assert_eq!(scans, expected);

        // Ordering (a1=b1, c1=d1, a2=c2) skips c1=d1 and re-applies it on top.
        let mut estimator = Estimator::new();
        let predicates = &projected.join_predicates;
        let ordered = vec![&predicates[0], &predicates[1], &predicates[2]];
        let plan = build_chain(&projected.subtrees, &ordered, &mut estimator).unwrap();
        assert_eq!(
            plan.to_string(),
            "SELECT [c1=d1] ((((A) JOIN [a1=b1] (B)) JOIN [a2=c2] (C)) TIMES (D))"
        );
    }

    #[test]
    fn test_cycle_closing_predicate_becomes_select() {
        let config = OptimizerConfig::default();
        let projected = projected("SELECT * FROM A,B,C WHERE a1=b1,b2=c2,a2=c1", &config);
        let mut estimator = Estimator::new();
        let predicates = &projected.join_predicates;
        let ordered = vec![&predicates[0], &predicates[1], &predicates[2]];
        let plan = build_chain(&projected.subtrees, &ordered, &mut estimator).unwrap();
        assert_eq!(
            plan.to_string(),
            "SELECT [a2=c1] (((A) JOIN [a1=b1] (B)) JOIN [b2=c2] (C))"
        );
    }

    #[test]
    fn test_search_limit() {
        let config = OptimizerConfig {
            max_join_predicates: 1,
            ..OptimizerConfig::default()
        };
        let result = search_join_order(
            &projected("SELECT * FROM A,B,C WHERE a1=b1,b2=c2", &config),
            &config,
        );
        assert!(matches!(
            result,
            Err(Error::JoinSearchLimit { predicates: 2, limit: 1 })
        ));
    }

    #[test]
    fn test_unresolvable_join_attribute() {
        let config = OptimizerConfig::default();
        let mut projected = projected("SELECT * FROM A,B WHERE a1=b1", &config);
        projected.subtrees.truncate(1);
        assert!(matches!(
            search_join_order(&projected, &config),
            Err(Error::ConsistencyViolation(_))
        ));
    }
}
