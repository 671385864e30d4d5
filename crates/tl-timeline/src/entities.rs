use tl_ecs::Entity;

use crate::components::{Playable, PlayheadTag, UnitPosition, ViewportPosition};
use crate::Timeline;

/// Creates a playhead entity in the timeline's world, with its position,
/// projection and playback components. Emissions are batched so observers
/// see the entity fully formed.
pub fn create_playhead(timeline: &Timeline, initial_position: f64) -> Entity {
    let world = timeline.world();
    let batch = world.batch();
    let entity = world.create_entity();
    world.add_component(entity, PlayheadTag);
    world.add_component(
        entity,
        UnitPosition {
            unit: initial_position,
            ..UnitPosition::default()
        },
    );
    world.add_component(entity, ViewportPosition::default());
    world.add_component(entity, Playable::default());
    drop(batch);
    entity
}
