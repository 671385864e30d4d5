use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tl_signal::Subscription;
use tracing::trace;

use crate::{ChangeKind, Component, Entity, StructuralChange};

type BoxedValue = Box<dyn Any + Send + Sync>;
type CellListener = Arc<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;
type StructureListener = Arc<dyn Fn(&StructuralChange) + Send + Sync>;
type ListenerVec<L> = Arc<Mutex<Vec<(u64, L)>>>;

/// Storage for one component attached to one entity.
struct ComponentCell {
    value: BoxedValue,
    /// Clones the type-erased value so listeners can be called lock-free.
    cloner: fn(&BoxedValue) -> Option<BoxedValue>,
    listeners: ListenerVec<CellListener>,
}

fn clone_cell_value<C: Component>(value: &BoxedValue) -> Option<BoxedValue> {
    value
        .downcast_ref::<C>()
        .map(|v| Box::new(v.clone()) as BoxedValue)
}

#[derive(Default)]
struct BatchState {
    depth: u32,
    pending_structure: Vec<StructuralChange>,
    pending_components: Vec<(Entity, &'static str)>,
}

/// The entity/component registry.
///
/// All mutation goes through `&self` methods; the world is shared as
/// `Arc<World>`. Mutation happens under a write lock, the lock is dropped,
/// and only then are listeners notified, so listeners are free to read (or
/// mutate) the world re-entrantly.
pub struct World {
    next_entity: AtomicU64,
    /// Presence in the outer map is what makes an entity alive.
    components: RwLock<AHashMap<Entity, AHashMap<&'static str, ComponentCell>>>,
    structure_listeners: ListenerVec<StructureListener>,
    next_listener_id: AtomicU64,
    batch_state: Mutex<BatchState>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            next_entity: AtomicU64::new(0),
            components: RwLock::new(AHashMap::new()),
            structure_listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            batch_state: Mutex::new(BatchState::default()),
        }
    }

    /* -------------------- entities -------------------- */

    /// Allocates a fresh entity. Ids strictly increase and are never reused.
    pub fn create_entity(&self) -> Entity {
        let raw = self.next_entity.fetch_add(1, Ordering::Relaxed) + 1;
        let entity = Entity::from_raw(raw);
        self.components.write().insert(entity, AHashMap::new());
        self.emit_structure(StructuralChange {
            kind: ChangeKind::EntityCreated,
            entity,
            component: None,
        });
        entity
    }

    /// Removes an entity and every component attached to it.
    pub fn destroy_entity(&self, entity: Entity) {
        let removed = self.components.write().remove(&entity).is_some();
        if removed {
            self.emit_structure(StructuralChange {
                kind: ChangeKind::EntityDestroyed,
                entity,
                component: None,
            });
        }
    }

    /// Snapshot of all live entities, in id order.
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.components.read().keys().copied().collect();
        entities.sort_unstable();
        entities
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.components.read().contains_key(&entity)
    }

    /* -------------------- components -------------------- */

    /// Attaches a component value to an entity.
    ///
    /// Replaces any previous value of the same component, keeping existing
    /// listeners. No-op for a dead entity.
    pub fn add_component<C: Component>(&self, entity: Entity, value: C) {
        {
            let mut map = self.components.write();
            let Some(cells) = map.get_mut(&entity) else {
                return;
            };
            match cells.get_mut(C::NAME) {
                Some(cell) => cell.value = Box::new(value),
                None => {
                    cells.insert(
                        C::NAME,
                        ComponentCell {
                            value: Box::new(value),
                            cloner: clone_cell_value::<C>,
                            listeners: Arc::new(Mutex::new(Vec::new())),
                        },
                    );
                }
            }
        }
        self.emit_structure(StructuralChange {
            kind: ChangeKind::ComponentAdded,
            entity,
            component: Some(C::NAME),
        });
    }

    /// Removes a component; emits only if it was present.
    pub fn remove_component<C: Component>(&self, entity: Entity) {
        let removed = {
            let mut map = self.components.write();
            map.get_mut(&entity)
                .map(|cells| cells.remove(C::NAME).is_some())
                .unwrap_or(false)
        };
        if removed {
            self.emit_structure(StructuralChange {
                kind: ChangeKind::ComponentRemoved,
                entity,
                component: Some(C::NAME),
            });
        }
    }

    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.has_component_named(entity, C::NAME)
    }

    /// Presence check by component name (used by query evaluation).
    pub fn has_component_named(&self, entity: Entity, name: &str) -> bool {
        self.components
            .read()
            .get(&entity)
            .map(|cells| cells.contains_key(name))
            .unwrap_or(false)
    }

    /// Pure read; `None` if the entity or component is absent.
    pub fn get_component<C: Component>(&self, entity: Entity) -> Option<C> {
        self.components
            .read()
            .get(&entity)?
            .get(C::NAME)?
            .value
            .downcast_ref::<C>()
            .cloned()
    }

    /// Updates a component value in place.
    ///
    /// Equality gated: if the updater leaves the value equal to what it was,
    /// nothing is emitted at all. No-op when the component is absent.
    pub fn update_component<C: Component>(&self, entity: Entity, updater: impl FnOnce(&mut C)) {
        let changed = {
            let mut map = self.components.write();
            let Some(cell) = map.get_mut(&entity).and_then(|cells| cells.get_mut(C::NAME)) else {
                return;
            };
            let Some(value) = cell.value.downcast_mut::<C>() else {
                return;
            };
            let previous = value.clone();
            updater(value);
            *value != previous
        };
        if changed {
            self.queue_component_emit(entity, C::NAME);
            self.emit_structure(StructuralChange {
                kind: ChangeKind::ComponentUpdated,
                entity,
                component: Some(C::NAME),
            });
        }
    }

    /// Subscribes to value changes of one component on one entity.
    ///
    /// The listener is replayed with the current value immediately. Returns
    /// a no-op handle when the component is absent.
    pub fn subscribe_component<C: Component>(
        &self,
        entity: Entity,
        listener: impl Fn(&C) + Send + Sync + 'static,
    ) -> Subscription {
        let (listeners, current) = {
            let map = self.components.read();
            let Some(cell) = map.get(&entity).and_then(|cells| cells.get(C::NAME)) else {
                return Subscription::noop();
            };
            let current = cell.value.downcast_ref::<C>().cloned();
            (cell.listeners.clone(), current)
        };

        let erased: CellListener = Arc::new(move |any| {
            if let Some(value) = any.downcast_ref::<C>() {
                listener(value);
            }
        });
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        listeners.lock().push((id, erased.clone()));

        if let Some(current) = current {
            erased(&current);
        }

        Subscription::new(move || {
            listeners.lock().retain(|(lid, _)| *lid != id);
        })
    }

    /* -------------------- structure -------------------- */

    /// Subscribes to all structural changes (entity and component events).
    pub fn subscribe_structure(
        &self,
        listener: impl Fn(&StructuralChange) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.structure_listeners.lock().push((id, Arc::new(listener)));
        let listeners = self.structure_listeners.clone();
        Subscription::new(move || {
            listeners.lock().retain(|(lid, _)| *lid != id);
        })
    }

    fn emit_structure(&self, change: StructuralChange) {
        let deferred = {
            let mut batch = self.batch_state.lock();
            if batch.depth > 0 {
                if !batch.pending_structure.contains(&change) {
                    batch.pending_structure.push(change);
                }
                true
            } else {
                false
            }
        };
        if !deferred {
            self.notify_structure(&change);
        }
    }

    fn notify_structure(&self, change: &StructuralChange) {
        trace!(?change, "structural change");
        let listeners: Vec<StructureListener> = self
            .structure_listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    fn queue_component_emit(&self, entity: Entity, name: &'static str) {
        let deferred = {
            let mut batch = self.batch_state.lock();
            if batch.depth > 0 {
                if !batch.pending_components.contains(&(entity, name)) {
                    batch.pending_components.push((entity, name));
                }
                true
            } else {
                false
            }
        };
        if !deferred {
            self.notify_component(entity, name);
        }
    }

    fn notify_component(&self, entity: Entity, name: &'static str) {
        let (value, listeners) = {
            let map = self.components.read();
            let Some(cell) = map.get(&entity).and_then(|cells| cells.get(name)) else {
                return;
            };
            let Some(value) = (cell.cloner)(&cell.value) else {
                return;
            };
            let listeners: Vec<CellListener> =
                cell.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
            (value, listeners)
        };
        for listener in listeners {
            listener(value.as_ref());
        }
    }

    /* -------------------- batching -------------------- */

    /// Opens a transaction scope deferring all emissions.
    ///
    /// Structural and component notifications triggered while any [`Batch`]
    /// guard is alive are queued, collapsed by identity, and flushed when
    /// the outermost guard drops. Scopes nest.
    pub fn batch(&self) -> Batch<'_> {
        self.batch_state.lock().depth += 1;
        Batch { world: self }
    }
}

/// RAII guard for a [`World::batch`] scope.
#[must_use = "emissions are deferred only while the guard is alive"]
pub struct Batch<'w> {
    world: &'w World,
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        let (components, structures) = {
            let mut batch = self.world.batch_state.lock();
            batch.depth -= 1;
            if batch.depth > 0 {
                return;
            }
            (
                std::mem::take(&mut batch.pending_components),
                std::mem::take(&mut batch.pending_structure),
            )
        };
        for (entity, name) in components {
            self.world.notify_component(entity, name);
        }
        for change in structures {
            self.world.notify_structure(&change);
        }
    }
}
