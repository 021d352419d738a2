//! Archetype-based storage core for an entity-component system.
//!
//! Entities are grouped by their exact component signature into
//! [`archetype::Archetype`]s; each archetype owns dense, typed
//! [`column::GrowableColumn`]s for its components' field data and a
//! sparse-set membership index for O(1) entity lookup and removal.
//! [`registry::ArchetypeRegistry`] owns the set of archetypes, deduplicates
//! them by signature, caches the add/remove transition graph between them,
//! and answers superset queries over an inverted component index.
//!
//! Entity id allocation, component schema front-end registration and
//! validation, and system/query scheduling all live above this crate — it
//! only ever consumes opaque [`entity::EntityId`] handles and [`component::ComponentId`]s
//! assigned by its caller.

pub mod archetype;
pub mod bitset;
pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod registry;
pub mod sparse;

pub use archetype::{Archetype, ArchetypeId};
pub use bitset::BitSet;
pub use column::{ColumnGroup, ColumnView, FieldValue, GrowableColumn};
pub use component::{ComponentId, ComponentSchema, ElementType, Field};
pub use entity::EntityId;
pub use error::EcsError;
pub use registry::{ArchetypeRegistry, QueryHandle};
pub use sparse::{SparseMap, SparseRowIndex, SparseSet};
