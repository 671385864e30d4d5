//! Minimal entity-component-system for reactive timeline entities
//!
//! The [`World`] owns entity identities and their attached component data
//! and broadcasts structural changes; [`QueryInstance`] maintains a live,
//! incrementally updated view over it, and [`ReactiveSystem`] attaches
//! enter/exit/update behavior to a query.

mod change;
mod component;
mod entity;
mod query;
mod query_instance;
mod system;
mod world;

pub use change::{ChangeKind, StructuralChange};
pub use component::Component;
pub use entity::Entity;
pub use query::{collect_deps, match_query, Query, QueryExpr};
pub use query_instance::{QueryDiff, QueryInstance};
pub use system::{ReactiveSystem, SystemHandlers};
pub use world::{Batch, World};
