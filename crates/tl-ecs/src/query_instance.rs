use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::Mutex;
use tl_signal::Subscription;

use crate::{ChangeKind, Entity, Query, StructuralChange, World};

type SetListener = Arc<dyn Fn(&[Entity]) + Send + Sync>;
type DiffListener = Arc<dyn Fn(&QueryDiff) + Send + Sync>;

/// Membership delta produced by one structural change.
///
/// `updated` carries matched entities whose dependency components changed
/// value without affecting membership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryDiff {
    pub entered: Vec<Entity>,
    pub exited: Vec<Entity>,
    pub updated: Vec<Entity>,
}

impl QueryDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty() && self.updated.is_empty()
    }
}

struct InstanceInner {
    world: Arc<World>,
    query: Query,
    /// Component names that can affect membership; other component events
    /// are ignored without re-evaluating.
    deps: AHashSet<&'static str>,
    matched: Mutex<Vec<Entity>>,
    set_listeners: Mutex<Vec<(u64, SetListener)>>,
    diff_listeners: Mutex<Vec<(u64, DiffListener)>>,
    next_listener_id: AtomicU64,
}

/// A live, incrementally maintained view of the entities matching a [`Query`].
///
/// Seeded with a full scan at construction, then kept current from the
/// world's structural-change stream. Dropping the instance detaches it.
pub struct QueryInstance {
    inner: Arc<InstanceInner>,
    _structure_sub: Subscription,
}

impl QueryInstance {
    pub fn new(world: &Arc<World>, query: Query) -> Self {
        let deps = query.deps();
        let matched: Vec<Entity> = world
            .entities()
            .into_iter()
            .filter(|&e| query.matches(world, e))
            .collect();

        let inner = Arc::new(InstanceInner {
            world: world.clone(),
            query,
            deps,
            matched: Mutex::new(matched),
            set_listeners: Mutex::new(Vec::new()),
            diff_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        });

        let handler = inner.clone();
        let structure_sub =
            world.subscribe_structure(move |change| handler.apply_change(change));

        Self {
            inner,
            _structure_sub: structure_sub,
        }
    }

    /// Snapshot of the current matching set, in entity-id order.
    pub fn entities(&self) -> Vec<Entity> {
        self.inner.matched.lock().clone()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.matched.lock().binary_search(&entity).is_ok()
    }

    /// Subscribes to the matching set; replays the current set immediately.
    pub fn subscribe(
        &self,
        listener: impl Fn(&[Entity]) + Send + Sync + 'static,
    ) -> Subscription {
        let listener: SetListener = Arc::new(listener);
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.set_listeners.lock().push((id, listener.clone()));

        listener(&self.inner.matched.lock().clone());

        let inner = self.inner.clone();
        Subscription::new(move || {
            inner.set_listeners.lock().retain(|(lid, _)| *lid != id);
        })
    }

    /// Subscribes to membership deltas. No replay; only future changes.
    pub fn subscribe_diff(
        &self,
        listener: impl Fn(&QueryDiff) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.diff_listeners.lock().push((id, Arc::new(listener)));
        let inner = self.inner.clone();
        Subscription::new(move || {
            inner.diff_listeners.lock().retain(|(lid, _)| *lid != id);
        })
    }

    /// Detaches from the world and drops all listeners. Equivalent to
    /// dropping the instance.
    pub fn destroy(self) {
        drop(self);
    }
}

impl InstanceInner {
    fn apply_change(self: &Arc<Self>, change: &StructuralChange) {
        // Entity lifecycle always matters; component events only when the
        // component participates in the query.
        if let Some(component) = change.component {
            if !self.deps.contains(component) {
                return;
            }
        }

        let entity = change.entity;
        let (diff, membership_changed) = {
            let mut matched = self.matched.lock();
            let position = matched.binary_search(&entity);

            // Value updates leave presence untouched; matched entities get
            // an `updated` diff, unmatched ones are irrelevant.
            if change.kind == ChangeKind::ComponentUpdated {
                if position.is_err() {
                    return;
                }
                (
                    QueryDiff {
                        updated: vec![entity],
                        ..QueryDiff::default()
                    },
                    false,
                )
            } else {
                let now_matches = change.kind != ChangeKind::EntityDestroyed
                    && self.query.matches(&self.world, entity);
                match (position, now_matches) {
                    (Err(at), true) => {
                        matched.insert(at, entity);
                        (
                            QueryDiff {
                                entered: vec![entity],
                                ..QueryDiff::default()
                            },
                            true,
                        )
                    }
                    (Ok(at), false) => {
                        matched.remove(at);
                        (
                            QueryDiff {
                                exited: vec![entity],
                                ..QueryDiff::default()
                            },
                            true,
                        )
                    }
                    _ => return,
                }
            }
        };

        if membership_changed {
            let snapshot = self.matched.lock().clone();
            let set_listeners: Vec<SetListener> = self
                .set_listeners
                .lock()
                .iter()
                .map(|(_, l)| l.clone())
                .collect();
            for listener in set_listeners {
                listener(&snapshot);
            }
        }
        let diff_listeners: Vec<DiffListener> = self
            .diff_listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in diff_listeners {
            listener(&diff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryExpr;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Tracked;
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Unrelated;
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Score {
        value: u32,
    }

    crate::components! {
        Tracked => "qi-tracked",
        Unrelated => "qi-unrelated",
        Score => "qi-score",
    }

    fn tracked_query() -> Query {
        Query::new(QueryExpr::has::<Tracked>())
    }

    #[test]
    fn seeded_with_existing_matches() {
        let world = Arc::new(World::new());
        let a = world.create_entity();
        world.add_component(a, Tracked);
        let _b = world.create_entity();

        let instance = QueryInstance::new(&world, tracked_query());
        assert_eq!(instance.entities(), vec![a]);
        assert!(instance.contains(a));
    }

    #[test]
    fn membership_follows_component_presence() {
        let world = Arc::new(World::new());
        let instance = QueryInstance::new(&world, tracked_query());

        let diffs = Arc::new(Mutex::new(Vec::new()));
        let sink = diffs.clone();
        let _sub = instance.subscribe_diff(move |diff| sink.lock().push(diff.clone()));

        let e = world.create_entity();
        assert!(diffs.lock().is_empty(), "no component yet");

        world.add_component(e, Tracked);
        assert_eq!(instance.entities(), vec![e]);

        world.remove_component::<Tracked>(e);
        assert!(instance.entities().is_empty());

        let recorded = diffs.lock();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].entered, vec![e]);
        assert_eq!(recorded[1].exited, vec![e]);
    }

    #[test]
    fn unrelated_components_do_not_disturb_membership() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tracked);

        let instance = QueryInstance::new(&world, tracked_query());

        let notifications = Arc::new(Mutex::new(0usize));
        let sink = notifications.clone();
        let _sub = instance.subscribe_diff(move |_| *sink.lock() += 1);

        world.add_component(e, Unrelated);
        world.remove_component::<Unrelated>(e);
        assert_eq!(*notifications.lock(), 0);
        assert_eq!(instance.entities(), vec![e]);
    }

    #[test]
    fn value_updates_surface_as_updated_diffs() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Score { value: 1 });

        let instance = QueryInstance::new(&world, Query::new(QueryExpr::has::<Score>()));

        let diffs = Arc::new(Mutex::new(Vec::new()));
        let sink = diffs.clone();
        let _diff_sub = instance.subscribe_diff(move |diff| sink.lock().push(diff.clone()));

        let sets = Arc::new(Mutex::new(0usize));
        let set_sink = sets.clone();
        let set_sub = instance.subscribe(move |_| *set_sink.lock() += 1);

        world.update_component::<Score>(e, |s| s.value = 2);

        let recorded = diffs.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].updated, vec![e]);
        assert!(recorded[0].entered.is_empty() && recorded[0].exited.is_empty());
        // Membership did not change, so the set listener saw only the replay.
        assert_eq!(*sets.lock(), 1);
        drop(set_sub);
    }

    #[test]
    fn destroyed_entity_exits() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tracked);

        let instance = QueryInstance::new(&world, tracked_query());
        world.destroy_entity(e);
        assert!(instance.entities().is_empty());
    }

    #[test]
    fn subscribe_replays_current_set() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tracked);

        let instance = QueryInstance::new(&world, tracked_query());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = instance.subscribe(move |set| sink.lock().push(set.to_vec()));

        assert_eq!(*seen.lock(), vec![vec![e]]);
    }

    #[test]
    fn dropping_instance_detaches_it_from_the_world() {
        let world = Arc::new(World::new());
        let instance = QueryInstance::new(&world, tracked_query());
        drop(instance);

        // Must not panic or leak notifications into a dropped view.
        let e = world.create_entity();
        world.add_component(e, Tracked);
    }
}
