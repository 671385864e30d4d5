use crate::Entity;

/// Kinds of structural changes a [`crate::World`] can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    EntityCreated,
    EntityDestroyed,
    ComponentAdded,
    ComponentRemoved,
    ComponentUpdated,
}

/// A structural change event.
///
/// Component events carry the component name; entity creation/destruction
/// carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralChange {
    pub kind: ChangeKind,
    pub entity: Entity,
    pub component: Option<&'static str>,
}
