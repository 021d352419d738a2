//! The archetype registry: signature deduplication, the component inverted
//! index, the add/remove transition graph, and push-based live queries.
//!
//! Archetypes are created on demand and never destroyed for the life of the
//! registry — required so that cached edge targets and registered-query
//! results remain valid for as long as the registry lives (see spec §3,
//! "Lifecycles"). All mutating operations assume single-threaded, exclusive
//! access; there is no interior synchronization here, matching the
//! single-world-single-thread model the core is specified against.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::archetype::{Archetype, ArchetypeId};
use crate::bitset::BitSet;
use crate::component::{ComponentId, ComponentSchema};
use crate::error::EcsError;
use crate::sparse::SparseSet;

/// A live query result, push-extended every time a newly created archetype
/// matches. Cheap to clone — clones share the same backing result list.
#[derive(Clone)]
pub struct QueryHandle {
    mask: BitSet,
    results: Rc<RefCell<Vec<ArchetypeId>>>,
}

impl QueryHandle {
    #[inline]
    pub fn mask(&self) -> &BitSet {
        &self.mask
    }

    /// Snapshot of the archetypes matching this query so far.
    pub fn archetypes(&self) -> Vec<ArchetypeId> {
        self.results.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.results.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ArchetypeRegistry {
    archetypes: Vec<Archetype>,
    /// signature hash -> candidate archetype ids sharing that hash bucket.
    archetype_map: FxHashMap<u64, Vec<ArchetypeId>>,
    /// component id -> every archetype whose mask contains it.
    component_index: HashMap<ComponentId, SparseSet>,
    empty_archetype_id: ArchetypeId,
    registered_queries: Vec<QueryHandle>,
    schemas: HashMap<ComponentId, ComponentSchema>,
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        let mut registry = ArchetypeRegistry {
            archetypes: Vec::new(),
            archetype_map: FxHashMap::default(),
            component_index: HashMap::new(),
            empty_archetype_id: ArchetypeId::new(0),
            registered_queries: Vec::new(),
            schemas: HashMap::new(),
        };
        let empty_id = registry.get_or_create_from_mask(BitSet::new());
        registry.empty_archetype_id = empty_id;
        registry
    }
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a component's static schema so future archetypes carrying it
    /// get the right column layout. The schema/reflection front-end proper
    /// lives above this crate; this is the minimal seam the registry needs.
    pub fn register_component_schema(&mut self, schema: ComponentSchema) {
        self.schemas.insert(schema.id(), schema);
    }

    #[inline]
    pub fn empty_archetype_id(&self) -> ArchetypeId {
        self.empty_archetype_id
    }

    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn get(&self, id: ArchetypeId) -> Result<&Archetype, EcsError> {
        self.archetypes.get(id.index()).ok_or(EcsError::UnknownArchetype(id))
    }

    pub fn get_mut(&mut self, id: ArchetypeId) -> Result<&mut Archetype, EcsError> {
        self.archetypes
            .get_mut(id.index())
            .ok_or(EcsError::UnknownArchetype(id))
    }

    /// Mutable access to two distinct archetypes at once, needed by a Store
    /// orchestrator moving a row between a source and a target archetype.
    ///
    /// Precondition: `a != b`.
    pub fn get_pair_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> (&mut Archetype, &mut Archetype) {
        crate::error::assert_precondition(
            a != b,
            "get_pair_mut called with the same archetype twice",
        );
        if a.index() > b.index() {
            let (left, right) = self.archetypes.split_at_mut(a.index());
            (&mut right[0], &mut left[b.index()])
        } else {
            let (left, right) = self.archetypes.split_at_mut(b.index());
            (&mut left[a.index()], &mut right[0])
        }
    }

    pub fn iter_archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Builds a mask from a signature (a list of component ids), rejecting
    /// duplicates, then delegates to [`Self::get_or_create_from_mask`].
    /// Dedup is by mask, so signature order never affects the result.
    pub fn get_or_create(&mut self, signature: &[ComponentId]) -> Result<ArchetypeId, EcsError> {
        let mut mask = BitSet::new();
        for &component in signature {
            let bit = component.index() as u32;
            if mask.has(bit) {
                return Err(EcsError::DuplicateComponentInSchema(component));
            }
            mask.set(bit);
        }
        Ok(self.get_or_create_from_mask(mask))
    }

    pub fn get_or_create_from_mask(&mut self, mask: BitSet) -> ArchetypeId {
        let hash = mask.hash_value();
        if let Some(bucket) = self.archetype_map.get(&hash) {
            for &candidate in bucket {
                if self.archetypes[candidate.index()].mask().equals(&mask) {
                    return candidate;
                }
            }
        }

        let id = ArchetypeId::new(self.archetypes.len() as u32);
        tracing::debug!(archetype = id.index(), "creating new archetype");
        let archetype = Archetype::new(id, mask.clone(), &self.schemas);
        self.archetypes.push(archetype);
        self.archetype_map.entry(hash).or_default().push(id);

        mask.for_each(|bit| {
            self.component_index
                .entry(ComponentId::new(bit))
                .or_insert_with(SparseSet::new)
                .insert(id.index());
        });

        for query in &mut self.registered_queries {
            if self.archetypes[id.index()].matches(&query.mask) {
                query.results.borrow_mut().push(id);
            }
        }

        id
    }

    /// Resolves the archetype reached by adding `component` to `source`.
    /// Returns `source` unchanged if it already carries the component.
    /// Caches both the forward `add` edge and the reverse `remove` edge on
    /// first resolution so repeated calls never create new archetypes.
    pub fn resolve_add(
        &mut self,
        source: ArchetypeId,
        component: ComponentId,
    ) -> Result<ArchetypeId, EcsError> {
        {
            let archetype = self.get(source)?;
            if archetype.has_component(component) {
                return Ok(source);
            }
            if let Some(cached) = archetype.edges.get_add(component) {
                return Ok(cached);
            }
        }

        let target_mask = self.get(source)?.mask().copy_with_set(component.index() as u32);
        let target = self.get_or_create_from_mask(target_mask);
        tracing::trace!(?source, ?target, component = component.index(), "resolve_add");

        self.get_mut(source)?.edges.set_add(component, target);
        self.get_mut(target)?.edges.set_remove(component, source);
        Ok(target)
    }

    /// Resolves the archetype reached by removing `component` from `source`.
    /// Returns `source` unchanged if it doesn't carry the component.
    pub fn resolve_remove(
        &mut self,
        source: ArchetypeId,
        component: ComponentId,
    ) -> Result<ArchetypeId, EcsError> {
        {
            let archetype = self.get(source)?;
            if !archetype.has_component(component) {
                return Ok(source);
            }
            if let Some(cached) = archetype.edges.get_remove(component) {
                return Ok(cached);
            }
        }

        let target_mask = self
            .get(source)?
            .mask()
            .copy_with_clear(component.index() as u32);
        let target = self.get_or_create_from_mask(target_mask);
        tracing::trace!(?source, ?target, component = component.index(), "resolve_remove");

        self.get_mut(source)?.edges.set_remove(component, target);
        self.get_mut(target)?.edges.set_add(component, source);
        Ok(target)
    }

    #[inline]
    pub fn get_component_archetype_count(&self, component: ComponentId) -> usize {
        self.component_index
            .get(&component)
            .map(SparseSet::len)
            .unwrap_or(0)
    }

    /// Every archetype whose mask is a superset of `required`. For an empty
    /// `required`, that is every archetype including the empty one.
    pub fn get_matching(&self, required: &BitSet) -> Vec<ArchetypeId> {
        if required.is_empty() {
            return (0..self.archetypes.len())
                .map(|i| ArchetypeId::new(i as u32))
                .collect();
        }

        let mut smallest: Option<&SparseSet> = None;
        for bit in required.iter() {
            match self.component_index.get(&ComponentId::new(bit)) {
                None => return Vec::new(),
                Some(set) if set.is_empty() => return Vec::new(),
                Some(set) => {
                    if smallest.map_or(true, |s| set.len() < s.len()) {
                        smallest = Some(set);
                    }
                }
            }
        }

        let seed = match smallest {
            Some(set) => set,
            None => return Vec::new(),
        };

        seed.iter()
            .map(|idx| ArchetypeId::new(idx as u32))
            .filter(|&id| self.archetypes[id.index()].matches(required))
            .collect()
    }

    /// Registers a live query: returns a handle whose result list is
    /// populated with every current match and thereafter push-extended as
    /// matching archetypes are created, with no gap between the two halves.
    pub fn register_query(&mut self, mask: BitSet) -> QueryHandle {
        let initial = self.get_matching(&mask);
        let handle = QueryHandle {
            mask,
            results: Rc::new(RefCell::new(initial)),
        };
        self.registered_queries.push(handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ElementType, Field};

    fn comp(id: u32) -> ComponentId {
        ComponentId::new(id)
    }

    fn tag_schema(id: u32) -> ComponentSchema {
        ComponentSchema::tag(comp(id))
    }

    #[test]
    fn s1_basic_dedup() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        registry.register_component_schema(tag_schema(2));

        let a = registry.get_or_create(&[comp(1), comp(2)]).unwrap();
        let b = registry.get_or_create(&[comp(2), comp(1)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.archetype_count(), 2); // empty + this one
    }

    #[test]
    fn s2_add_remove_round_trip() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        registry.register_component_schema(tag_schema(2));

        let orig = registry.get_or_create(&[comp(1)]).unwrap();
        let with2 = registry.resolve_add(orig, comp(2)).unwrap();
        let back = registry.resolve_remove(with2, comp(2)).unwrap();
        assert_eq!(back, orig);
    }

    #[test]
    fn idempotent_transitions() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        let a = registry.get_or_create(&[comp(1)]).unwrap();
        assert_eq!(registry.resolve_add(a, comp(1)).unwrap(), a);
        let empty = registry.empty_archetype_id();
        assert_eq!(registry.resolve_remove(empty, comp(1)).unwrap(), empty);
    }

    #[test]
    fn edge_cache_stability() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        registry.register_component_schema(tag_schema(2));
        let a = registry.get_or_create(&[comp(1)]).unwrap();
        let before = registry.archetype_count();
        registry.resolve_add(a, comp(2)).unwrap();
        let after_first = registry.archetype_count();
        registry.resolve_add(a, comp(2)).unwrap();
        registry.resolve_add(a, comp(2)).unwrap();
        assert_eq!(after_first, registry.archetype_count());
        assert!(after_first > before);
    }

    #[test]
    fn s3_query_intersection() {
        let mut registry = ArchetypeRegistry::new();
        for id in [1, 2, 3] {
            registry.register_component_schema(tag_schema(id));
        }
        registry.get_or_create(&[comp(1), comp(2)]).unwrap();
        registry.get_or_create(&[comp(1), comp(3)]).unwrap();
        let abc = registry.get_or_create(&[comp(1), comp(2), comp(3)]).unwrap();

        let mut required = BitSet::new();
        required.set(1);
        required.set(2);
        let matches = registry.get_matching(&required);
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&abc));
    }

    #[test]
    fn query_correctness_against_every_archetype() {
        let mut registry = ArchetypeRegistry::new();
        for id in [1, 2, 3] {
            registry.register_component_schema(tag_schema(id));
        }
        registry.get_or_create(&[comp(1)]).unwrap();
        registry.get_or_create(&[comp(1), comp(2)]).unwrap();
        registry.get_or_create(&[comp(3)]).unwrap();

        let mut required = BitSet::new();
        required.set(1);
        let matching_ids: std::collections::HashSet<_> =
            registry.get_matching(&required).into_iter().collect();
        for archetype in registry.iter_archetypes() {
            let should_match = archetype.matches(&required);
            assert_eq!(matching_ids.contains(&archetype.id()), should_match);
        }
    }

    #[test]
    fn inverted_index_coverage() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        registry.register_component_schema(tag_schema(2));
        let id = registry.get_or_create(&[comp(1), comp(2)]).unwrap();
        for bit in registry.get(id).unwrap().mask().iter() {
            assert!(registry.get_component_archetype_count(comp(bit)) >= 1);
        }
    }

    #[test]
    fn empty_query_returns_all_archetypes() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        registry.get_or_create(&[comp(1)]).unwrap();
        let all = registry.get_matching(&BitSet::new());
        assert_eq!(all.len(), registry.archetype_count());
    }

    #[test]
    fn s6_live_query_growth() {
        let mut registry = ArchetypeRegistry::new();
        for id in [1, 2, 3] {
            registry.register_component_schema(tag_schema(id));
        }
        let mut mask = BitSet::new();
        mask.set(1);
        let query = registry.register_query(mask);
        assert!(query.is_empty());

        let first = registry.get_or_create(&[comp(1)]).unwrap();
        let second = registry.get_or_create(&[comp(1), comp(2)]).unwrap();
        registry.get_or_create(&[comp(3)]).unwrap();

        assert_eq!(query.archetypes(), vec![first, second]);
    }

    #[test]
    fn no_missing_component_short_circuits_query() {
        let registry = ArchetypeRegistry::new();
        let mut required = BitSet::new();
        required.set(99);
        assert!(registry.get_matching(&required).is_empty());
    }

    #[test]
    fn unknown_archetype_id_is_reported() {
        let registry = ArchetypeRegistry::new();
        let bogus = ArchetypeId::new(999);
        assert_eq!(registry.get(bogus), Err(EcsError::UnknownArchetype(bogus)));
    }

    #[test]
    fn duplicate_component_in_signature_is_rejected() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(tag_schema(1));
        let err = registry.get_or_create(&[comp(1), comp(1)]).unwrap_err();
        assert_eq!(err, EcsError::DuplicateComponentInSchema(comp(1)));
    }

    #[test]
    fn column_layout_survives_transitions() {
        let mut registry = ArchetypeRegistry::new();
        registry.register_component_schema(ComponentSchema::new(
            comp(1),
            vec![Field::new("x", ElementType::I32)],
        ));
        registry.register_component_schema(tag_schema(2));

        let with1 = registry.get_or_create(&[comp(1)]).unwrap();
        let with_both = registry.resolve_add(with1, comp(2)).unwrap();
        let archetype = registry.get(with_both).unwrap();
        assert!(archetype.has_component(comp(1)));
        assert!(archetype.has_component(comp(2)));
    }

    #[test]
    fn get_pair_mut_precondition_violation_reports_the_documented_kind() {
        let mut registry = ArchetypeRegistry::new();
        let empty = registry.empty_archetype_id();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.get_pair_mut(empty, empty);
        }));
        let payload = result.expect_err("get_pair_mut with two equal ids must panic");
        let message = payload
            .downcast_ref::<String>()
            .expect("panic payload should be a message string");
        assert_eq!(
            message,
            &EcsError::PreconditionViolation("get_pair_mut called with the same archetype twice")
                .to_string()
        );
    }
}
