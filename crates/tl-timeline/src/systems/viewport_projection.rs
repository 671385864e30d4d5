use std::sync::Arc;

use tl_ecs::{Entity, Query, QueryExpr, ReactiveSystem, SystemHandlers, World};

use crate::components::{UnitPosition, ViewportPosition};
use crate::{Timeline, WeakTimeline};

fn project(weak: &WeakTimeline, world: &Arc<World>, entity: Entity) {
    let Some(timeline) = weak.upgrade() else {
        return;
    };
    let Some(position) = world.get_component::<UnitPosition>(entity) else {
        return;
    };
    if !position.projectable || !timeline.viewport().is_connected() {
        return;
    }
    let px = timeline.project_to_chunk(position.unit);
    if world.has_component::<ViewportPosition>(entity) {
        world.update_component::<ViewportPosition>(entity, |vp| vp.px = px);
    } else {
        world.add_component(entity, ViewportPosition { px });
    }
}

/// Mirrors every projectable [`UnitPosition`] into a [`ViewportPosition`].
///
/// Re-projects when the unit position changes, and for all entities when
/// the chunk window or visible range moves. Inert until attached.
pub fn viewport_projection_system(timeline: &Timeline) -> ReactiveSystem {
    let chunk_change = timeline.store().map(|s| s.chunk_index).changed();
    let range_change = timeline
        .viewport()
        .store()
        .map(|s| s.visible_range)
        .changed();

    let weak = timeline.downgrade();
    let enter_weak = weak.clone();
    let update_weak = weak;

    ReactiveSystem::new(
        "viewport-projection",
        timeline.world(),
        Query::new(QueryExpr::has::<UnitPosition>()),
        SystemHandlers::new()
            .on_enter(move |world, entity| project(&enter_weak, world, entity))
            .on_update(move |world, entity| project(&update_weak, world, entity)),
    )
    .with_dependency(chunk_change)
    .with_dependency(range_change)
}
