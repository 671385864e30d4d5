use ahash::AHashSet;

use crate::{Component, Entity, World};

/// Boolean expression over component presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// Entity has a component with this name.
    Has(&'static str),
    /// All sub-expressions hold. Empty `And` matches every entity.
    And(Vec<QueryExpr>),
    /// At least one sub-expression holds. Empty `Or` matches nothing.
    Or(Vec<QueryExpr>),
    Not(Box<QueryExpr>),
}

impl QueryExpr {
    pub fn has<C: Component>() -> Self {
        QueryExpr::Has(C::NAME)
    }
}

/// A reusable description of which entities a system cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub expr: QueryExpr,
}

impl Query {
    pub fn new(expr: QueryExpr) -> Self {
        Self { expr }
    }

    /// Shorthand for "has all of these components".
    pub fn all(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self::new(QueryExpr::And(names.into_iter().map(QueryExpr::Has).collect()))
    }

    /// The set of component names this query can ever depend on.
    pub fn deps(&self) -> AHashSet<&'static str> {
        let mut deps = AHashSet::new();
        collect_deps(&self.expr, &mut deps);
        deps
    }

    pub fn matches(&self, world: &World, entity: Entity) -> bool {
        world.contains(entity) && match_query(world, entity, &self.expr)
    }
}

/// Evaluates `expr` against the entity's current components.
pub fn match_query(world: &World, entity: Entity, expr: &QueryExpr) -> bool {
    match expr {
        QueryExpr::Has(name) => world.has_component_named(entity, name),
        QueryExpr::And(exprs) => exprs.iter().all(|e| match_query(world, entity, e)),
        QueryExpr::Or(exprs) => exprs.iter().any(|e| match_query(world, entity, e)),
        QueryExpr::Not(inner) => !match_query(world, entity, inner),
    }
}

/// Collects every component name mentioned anywhere in `expr`.
pub fn collect_deps(expr: &QueryExpr, out: &mut AHashSet<&'static str>) {
    match expr {
        QueryExpr::Has(name) => {
            out.insert(name);
        }
        QueryExpr::And(exprs) | QueryExpr::Or(exprs) => {
            for e in exprs {
                collect_deps(e, out);
            }
        }
        QueryExpr::Not(inner) => collect_deps(inner, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct A;
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct B;

    crate::components! {
        A => "query-a",
        B => "query-b",
    }

    #[test]
    fn empty_and_matches_everything() {
        let world = World::new();
        let e = world.create_entity();
        assert!(Query::new(QueryExpr::And(vec![])).matches(&world, e));
    }

    #[test]
    fn empty_or_matches_nothing() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, A);
        assert!(!Query::new(QueryExpr::Or(vec![])).matches(&world, e));
    }

    #[test]
    fn boolean_combinators() {
        let world = World::new();
        let e = world.create_entity();
        world.add_component(e, A);

        assert!(match_query(&world, e, &QueryExpr::has::<A>()));
        assert!(!match_query(&world, e, &QueryExpr::has::<B>()));
        assert!(match_query(
            &world,
            e,
            &QueryExpr::Or(vec![QueryExpr::has::<A>(), QueryExpr::has::<B>()])
        ));
        assert!(!match_query(
            &world,
            e,
            &QueryExpr::And(vec![QueryExpr::has::<A>(), QueryExpr::has::<B>()])
        ));
        assert!(match_query(
            &world,
            e,
            &QueryExpr::Not(Box::new(QueryExpr::has::<B>()))
        ));
    }

    #[test]
    fn dead_entity_never_matches() {
        let world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e);
        assert!(!Query::new(QueryExpr::And(vec![])).matches(&world, e));
    }

    #[test]
    fn deps_cover_every_mentioned_component() {
        let query = Query::new(QueryExpr::And(vec![
            QueryExpr::has::<A>(),
            QueryExpr::Not(Box::new(QueryExpr::Or(vec![QueryExpr::has::<B>()]))),
        ]));
        let deps = query.deps();
        assert!(deps.contains("query-a"));
        assert!(deps.contains("query-b"));
        assert_eq!(deps.len(), 2);
    }
}
