use std::sync::Arc;

use parking_lot::Mutex;
use tl_signal::{Signal, Subscription};
use tracing::debug;

use crate::{Entity, Query, QueryInstance, World};

type Handler = Box<dyn Fn(&Arc<World>, Entity) + Send + Sync>;

/// Callbacks a [`ReactiveSystem`] runs as entities move through its query.
///
/// `on_update` fires when a component the query depends on changes value on
/// an entity that is already in the matching set.
#[derive(Default)]
pub struct SystemHandlers {
    pub on_enter: Option<Handler>,
    pub on_exit: Option<Handler>,
    pub on_update: Option<Handler>,
}

impl SystemHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(mut self, f: impl Fn(&Arc<World>, Entity) + Send + Sync + 'static) -> Self {
        self.on_enter = Some(Box::new(f));
        self
    }

    pub fn on_exit(mut self, f: impl Fn(&Arc<World>, Entity) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(&Arc<World>, Entity) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }
}

struct SystemInner {
    name: &'static str,
    world: Arc<World>,
    instance: QueryInstance,
    handlers: SystemHandlers,
}

impl SystemInner {
    fn run_enter(&self, entity: Entity) {
        if let Some(f) = &self.handlers.on_enter {
            f(&self.world, entity);
        }
    }

    fn run_exit(&self, entity: Entity) {
        if let Some(f) = &self.handlers.on_exit {
            f(&self.world, entity);
        }
    }

    fn run_update(&self, entity: Entity) {
        if let Some(f) = &self.handlers.on_update {
            f(&self.world, entity);
        }
    }
}

/// A behavior bound to a query: enter/exit/update handlers that follow the
/// matching set, plus optional external signals that re-run the update
/// handler for every matched entity.
///
/// Does nothing until [`attach`](Self::attach); [`detach`](Self::detach)
/// stops all callbacks without touching the world.
pub struct ReactiveSystem {
    inner: Arc<SystemInner>,
    dep_signals: Mutex<Vec<Signal<()>>>,
    subs: Mutex<Vec<Subscription>>,
}

impl ReactiveSystem {
    pub fn new(
        name: &'static str,
        world: &Arc<World>,
        query: Query,
        handlers: SystemHandlers,
    ) -> Self {
        let instance = QueryInstance::new(world, query);
        Self {
            inner: Arc::new(SystemInner {
                name,
                world: world.clone(),
                instance,
                handlers,
            }),
            dep_signals: Mutex::new(Vec::new()),
            subs: Mutex::new(Vec::new()),
        }
    }

    /// Adds an external pulse source. While attached, every emission runs
    /// the update handler for each matched entity (including one run at
    /// subscribe time, which seeds initial state).
    pub fn with_dependency(self, signal: Signal<()>) -> Self {
        self.dep_signals.lock().push(signal);
        self
    }

    /// Entities currently matched by the system's query.
    pub fn entities(&self) -> Vec<Entity> {
        self.inner.instance.entities()
    }

    pub fn is_attached(&self) -> bool {
        !self.subs.lock().is_empty()
    }

    /// Starts the system: runs `on_enter` for everything already matched,
    /// then follows the query and dependency signals.
    pub fn attach(&self) {
        let mut subs = self.subs.lock();
        if !subs.is_empty() {
            return;
        }
        debug!(system = self.inner.name, "attaching system");

        for entity in self.inner.instance.entities() {
            self.inner.run_enter(entity);
        }

        let handler = self.inner.clone();
        subs.push(self.inner.instance.subscribe_diff(move |diff| {
            for &entity in &diff.entered {
                handler.run_enter(entity);
            }
            for &entity in &diff.exited {
                handler.run_exit(entity);
            }
            for &entity in &diff.updated {
                handler.run_update(entity);
            }
        }));

        for signal in self.dep_signals.lock().iter() {
            let handler = self.inner.clone();
            subs.push(signal.subscribe(move |_| {
                for entity in handler.instance.entities() {
                    handler.run_update(entity);
                }
            }));
        }
    }

    /// Stops all callbacks. The matching set keeps tracking the world, so a
    /// later [`attach`](Self::attach) resumes from current state.
    pub fn detach(&self) {
        debug!(system = self.inner.name, "detaching system");
        self.subs.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryExpr;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Tick {
        count: u32,
    }

    crate::components! {
        Tick => "sys-tick",
    }

    fn tick_query() -> Query {
        Query::new(QueryExpr::has::<Tick>())
    }

    #[derive(Default)]
    struct Log {
        entered: Vec<Entity>,
        exited: Vec<Entity>,
        updated: Vec<Entity>,
    }

    fn logging_system(world: &Arc<World>, log: &Arc<Mutex<Log>>) -> ReactiveSystem {
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        ReactiveSystem::new(
            "logging",
            world,
            tick_query(),
            SystemHandlers::new()
                .on_enter(move |_, e| a.lock().entered.push(e))
                .on_exit(move |_, e| b.lock().exited.push(e))
                .on_update(move |_, e| c.lock().updated.push(e)),
        )
    }

    #[test]
    fn enter_runs_for_preexisting_matches_on_attach() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tick::default());

        let log = Arc::new(Mutex::new(Log::default()));
        let system = logging_system(&world, &log);
        assert!(log.lock().entered.is_empty(), "inert until attached");

        system.attach();
        assert_eq!(log.lock().entered, vec![e]);
    }

    #[test]
    fn enter_exit_follow_membership() {
        let world = Arc::new(World::new());
        let log = Arc::new(Mutex::new(Log::default()));
        let system = logging_system(&world, &log);
        system.attach();

        let e = world.create_entity();
        world.add_component(e, Tick::default());
        world.remove_component::<Tick>(e);

        let log = log.lock();
        assert_eq!(log.entered, vec![e]);
        assert_eq!(log.exited, vec![e]);
    }

    #[test]
    fn update_fires_for_dep_component_changes_only() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tick::default());

        let log = Arc::new(Mutex::new(Log::default()));
        let system = logging_system(&world, &log);
        system.attach();

        world.update_component::<Tick>(e, |t| t.count += 1);
        assert_eq!(log.lock().updated, vec![e]);

        // Equal value never reaches the system.
        world.update_component::<Tick>(e, |t| t.count = 1);
        assert_eq!(log.lock().updated, vec![e]);
    }

    #[test]
    fn detach_silences_callbacks() {
        let world = Arc::new(World::new());
        let log = Arc::new(Mutex::new(Log::default()));
        let system = logging_system(&world, &log);
        system.attach();
        system.detach();
        assert!(!system.is_attached());

        let e = world.create_entity();
        world.add_component(e, Tick::default());
        assert!(log.lock().entered.is_empty());
    }

    #[test]
    fn dependency_signal_reruns_update_for_all_matches() {
        let world = Arc::new(World::new());
        let e = world.create_entity();
        world.add_component(e, Tick::default());

        let clock = tl_signal::Store::new(0u64);
        let log = Arc::new(Mutex::new(Log::default()));
        let system = logging_system(&world, &log).with_dependency(clock.changed());
        system.attach();

        // One seed run at subscribe time.
        assert_eq!(log.lock().updated, vec![e]);

        clock.set(1);
        assert_eq!(log.lock().updated, vec![e, e]);
    }
}
