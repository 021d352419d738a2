//! Archetype storage: the sparse-set membership index plus dense column
//! groups for every entity sharing one exact component signature.
//!
//! Archetypes run under precondition contracts rather than defensive
//! validation in the hot paths (`add_entity`, `remove_entity`, `get_column`):
//! a caller passing an entity index the archetype doesn't hold, or a
//! component id it doesn't carry, is a programming error.
//! [`crate::error::assert_precondition`] surfaces that as a panic carrying
//! [`crate::error::EcsError::PreconditionViolation`]'s message in
//! development builds; release builds elide the check entirely.

use std::collections::HashMap;

use crate::bitset::BitSet;
use crate::column::{ColumnGroup, FieldValue};
use crate::component::{ComponentId, ComponentSchema};
use crate::entity::EntityId;
use crate::error::EcsError;
use crate::sparse::SparseRowIndex;

/// Dense, stable id for an archetype within one [`crate::registry::ArchetypeRegistry`].
/// Never reused: archetypes live for the entire life of the registry so that
/// cached transition edges and registered-query results stay valid.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        ArchetypeId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) const EMPTY_ROW: i64 = SparseRowIndex::EMPTY_ROW;

/// Cached add/remove transition targets for one component, from one archetype.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct Edge {
    pub add: Option<ArchetypeId>,
    pub remove: Option<ArchetypeId>,
}

/// `component id -> cached transition edge`, populated lazily by the registry.
/// Opaque to callers outside this crate; the registry is the only writer.
#[derive(Debug, Default, Clone)]
pub(crate) struct Edges {
    edges: HashMap<ComponentId, Edge>,
}

impl Edges {
    fn entry(&mut self, component: ComponentId) -> &mut Edge {
        self.edges.entry(component).or_default()
    }

    pub(crate) fn get_add(&self, component: ComponentId) -> Option<ArchetypeId> {
        self.edges.get(&component).and_then(|e| e.add)
    }

    pub(crate) fn set_add(&mut self, component: ComponentId, target: ArchetypeId) {
        self.entry(component).add = Some(target);
    }

    pub(crate) fn get_remove(&self, component: ComponentId) -> Option<ArchetypeId> {
        self.edges.get(&component).and_then(|e| e.remove)
    }

    pub(crate) fn set_remove(&mut self, component: ComponentId, target: ArchetypeId) {
        self.entry(component).remove = Some(target);
    }
}

/// One archetype: the set of entities sharing an exact component signature,
/// and the dense column storage backing their field data.
pub struct Archetype {
    id: ArchetypeId,
    mask: BitSet,
    entity_ids: Vec<EntityId>,
    index_to_row: SparseRowIndex,
    column_groups: HashMap<ComponentId, ColumnGroup>,
    pub(crate) edges: Edges,
}

impl Archetype {
    /// Builds a fresh, empty archetype from the schemas of every component in
    /// `mask`. `schemas` must contain an entry for every set bit in `mask`;
    /// this is enforced by the registry, the sole caller of this constructor.
    pub(crate) fn new(
        id: ArchetypeId,
        mask: BitSet,
        schemas: &HashMap<ComponentId, ComponentSchema>,
    ) -> Self {
        let mut column_groups = HashMap::new();
        mask.for_each(|bit| {
            let component = ComponentId::new(bit);
            if let Some(schema) = schemas.get(&component) {
                if !schema.is_tag() {
                    column_groups.insert(component, ColumnGroup::from_schema(schema));
                }
            }
        });

        Archetype {
            id,
            mask,
            entity_ids: Vec::new(),
            index_to_row: SparseRowIndex::new(),
            column_groups,
            edges: Edges::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    #[inline]
    pub fn mask(&self) -> &BitSet {
        &self.mask
    }

    #[inline]
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.mask.has(component.index() as u32)
    }

    #[inline]
    pub fn matches(&self, required: &BitSet) -> bool {
        self.mask.contains(required)
    }

    #[inline]
    pub fn has_entity(&self, entity_index: usize) -> bool {
        self.index_to_row.get(entity_index) != EMPTY_ROW
    }

    /// Returns the row for `entity_index`, or `-1` if absent. Never raises —
    /// absence is the normal, expected outcome of a query miss.
    #[inline]
    pub fn get_row(&self, entity_index: usize) -> i64 {
        self.index_to_row.get(entity_index)
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entity_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    /// Stable view over rows `[0, entity_count)`. Invalidated by the next
    /// membership mutation on this archetype — don't retain across calls to
    /// `add_entity`/`remove_entity`.
    #[inline]
    pub fn entity_list(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// Direct reference to one field's column. Valid until the next growth
    /// of this archetype (any `add_entity`).
    pub fn get_column(
        &self,
        component: ComponentId,
        field_index: usize,
    ) -> Result<&crate::column::GrowableColumn, EcsError> {
        let group = self
            .column_groups
            .get(&component)
            .ok_or(EcsError::UnknownComponent(component))?;
        group.column(field_index).ok_or(EcsError::UnknownField {
            component,
            field: "<by-index>",
        })
    }

    /// Writes every field of `component` at `row` from `values`, in schema
    /// field order. A no-op for tag components (they own no column data).
    pub fn write_fields(
        &mut self,
        row: usize,
        component: ComponentId,
        schema: &ComponentSchema,
        values: &[FieldValue],
    ) -> Result<(), EcsError> {
        if schema.is_tag() {
            return Ok(());
        }
        if values.len() != schema.field_count() {
            return Err(EcsError::SchemaFieldCountMismatch {
                component,
                expected: schema.field_count(),
                actual: values.len(),
            });
        }
        let group = self
            .column_groups
            .get_mut(&component)
            .ok_or(EcsError::UnknownComponent(component))?;
        for (field_index, value) in values.iter().enumerate() {
            let column = group
                .column_mut(field_index)
                .ok_or(EcsError::UnknownField {
                    component,
                    field: schema.fields()[field_index].name,
                })?;
            column.set_at(row, *value).map_err(|_| EcsError::ValidationFailure {
                component,
                field: schema.fields()[field_index].name,
            })?;
        }
        Ok(())
    }

    /// Reads one field by name. Returns `None` for a tag component or an
    /// unknown field/component — never raises, since reading a tag
    /// component's (nonexistent) data is a legitimate, non-exceptional
    /// outcome.
    pub fn read_field(
        &self,
        row: usize,
        component: ComponentId,
        schema: &ComponentSchema,
        field: &str,
    ) -> Option<FieldValue> {
        let field_index = schema.column_index_of(field)?;
        let group = self.column_groups.get(&component)?;
        group.column(field_index)?.get(row)
    }

    /// Reads `field` of `component` at `row` as an `f64`, returning `NaN`
    /// instead of raising when `component` is a tag (no column data) or
    /// otherwise absent from this archetype — spec §7's "tag components are
    /// legitimately data-less" contract, expressed as a numeric read that
    /// never fails rather than an `Option`.
    pub fn read_field_as_f64(
        &self,
        row: usize,
        component: ComponentId,
        schema: &ComponentSchema,
        field: &str,
    ) -> f64 {
        let field_index = match schema.column_index_of(field) {
            Some(index) => index,
            None => return f64::NAN,
        };
        match self
            .column_groups
            .get(&component)
            .and_then(|group| group.column(field_index))
        {
            Some(column) => column.get_as_f64(row),
            None => f64::NAN,
        }
    }

    /// Field name -> column index for `component` within this archetype, or
    /// `None` if the archetype doesn't carry it. A read-only convenience over
    /// the layout an embedding caller would otherwise have to resolve through
    /// the original `ComponentSchema`.
    pub fn field_layout(&self, component: ComponentId) -> Option<&HashMap<&'static str, usize>> {
        self.column_groups.get(&component).map(|g| g.field_index())
    }

    /// Copies every field of `component` from `src_row` to `dst_row`, within
    /// this archetype. No-op for tag components.
    pub fn copy_row(&mut self, component: ComponentId, dst_row: usize, src_row: usize) {
        if let Some(group) = self.column_groups.get_mut(&component) {
            group.copy_row_within(dst_row, src_row);
        }
    }

    /// For every component present in both `self` and `source`, copies every
    /// field from `source`'s row to this archetype's row. Components unique
    /// to either side are left untouched.
    pub fn copy_shared_from(&mut self, source: &Archetype, src_row: usize, dst_row: usize) {
        for (component, src_group) in &source.column_groups {
            if let Some(dst_group) = self.column_groups.get_mut(component) {
                for (dst_col, src_col) in
                    dst_group.columns_mut().iter_mut().zip(src_group.columns())
                {
                    if let Some(value) = src_col.get(src_row) {
                        let _ = dst_col.set_at(dst_row, value);
                    }
                }
            }
        }
    }

    /// Adds `entity` (whose stable index is `entity_index`) as a new row.
    /// Grows dense storage and every column group together so their lengths
    /// stay synchronized, writes the handle, and updates the sparse index.
    pub fn add_entity(&mut self, entity: EntityId, entity_index: usize) -> usize {
        crate::error::assert_precondition(
            !self.has_entity(entity_index),
            "entity already present in this archetype",
        );
        let row = self.entity_ids.len();
        self.entity_ids.push(entity);
        for group in self.column_groups.values_mut() {
            group.push_default_row();
        }
        self.index_to_row.set(entity_index, row as i64);
        row
    }

    /// Removes `entity_index` via swap-and-pop. Returns the entity index
    /// that was swapped into the vacated row, or `-1` if the removed row was
    /// the last one (nothing swapped in).
    ///
    /// Precondition: `entity_index` is present in this archetype.
    pub fn remove_entity(&mut self, entity_index: usize) -> i64 {
        let row = self.index_to_row.get(entity_index);
        crate::error::assert_precondition(
            row != EMPTY_ROW,
            "removing an entity not in this archetype",
        );
        let row = row as usize;

        self.index_to_row.clear_entry(entity_index);
        let last = self.entity_ids.len() - 1;
        let swapped_entity_index = if row != last {
            Some(self.entity_ids[last].index())
        } else {
            None
        };

        self.entity_ids.swap_remove(row);
        for group in self.column_groups.values_mut() {
            group.swap_remove_row(row);
        }

        if let Some(swapped_index) = swapped_entity_index {
            self.index_to_row.set(swapped_index, row as i64);
            swapped_index as i64
        } else {
            -1
        }
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("entity_count", &self.entity_count())
            .finish()
    }
}
