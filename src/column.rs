//! Growable, per-field typed columns and the column group an archetype owns
//! per component.
//!
//! Each numeric element type gets its own `Vec<T>` behind an enum variant in
//! [`GrowableColumn`], rather than a single type-erased byte buffer: pushes,
//! reads and swap-removes never need `unsafe`, and the compiler checks every
//! element access for us. A byte-strided layout would shave indirection off
//! the hottest iteration loops, but isn't worth the `unsafe` surface for a
//! storage core whose contract is otherwise entirely safe Rust.

use std::collections::HashMap;

use crate::component::{ComponentSchema, ElementType};
use crate::error::EcsError;

/// A single typed numeric value read from, or to be written to, a column.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl FieldValue {
    fn element_type(&self) -> ElementType {
        match self {
            FieldValue::I8(_) => ElementType::I8,
            FieldValue::I16(_) => ElementType::I16,
            FieldValue::I32(_) => ElementType::I32,
            FieldValue::U8(_) => ElementType::U8,
            FieldValue::U16(_) => ElementType::U16,
            FieldValue::U32(_) => ElementType::U32,
            FieldValue::F32(_) => ElementType::F32,
            FieldValue::F64(_) => ElementType::F64,
        }
    }
}

/// A vector of fixed-width numeric elements with amortised push/pop and
/// swap-remove, matching one field of one component.
#[derive(Debug, Clone)]
pub enum GrowableColumn {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! column_dispatch {
    ($self:expr, |$v:ident| $body:expr) => {
        match $self {
            GrowableColumn::I8($v) => $body,
            GrowableColumn::I16($v) => $body,
            GrowableColumn::I32($v) => $body,
            GrowableColumn::U8($v) => $body,
            GrowableColumn::U16($v) => $body,
            GrowableColumn::U32($v) => $body,
            GrowableColumn::F32($v) => $body,
            GrowableColumn::F64($v) => $body,
        }
    };
}

impl GrowableColumn {
    pub fn new(element_type: ElementType) -> Self {
        match element_type {
            ElementType::I8 => GrowableColumn::I8(Vec::new()),
            ElementType::I16 => GrowableColumn::I16(Vec::new()),
            ElementType::I32 => GrowableColumn::I32(Vec::new()),
            ElementType::U8 => GrowableColumn::U8(Vec::new()),
            ElementType::U16 => GrowableColumn::U16(Vec::new()),
            ElementType::U32 => GrowableColumn::U32(Vec::new()),
            ElementType::F32 => GrowableColumn::F32(Vec::new()),
            ElementType::F64 => GrowableColumn::F64(Vec::new()),
        }
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        match self {
            GrowableColumn::I8(_) => ElementType::I8,
            GrowableColumn::I16(_) => ElementType::I16,
            GrowableColumn::I32(_) => ElementType::I32,
            GrowableColumn::U8(_) => ElementType::U8,
            GrowableColumn::U16(_) => ElementType::U16,
            GrowableColumn::U32(_) => ElementType::U32,
            GrowableColumn::F32(_) => ElementType::F32,
            GrowableColumn::F64(_) => ElementType::F64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        column_dispatch!(self, |v| v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves room for at least `min_capacity` total elements. A no-op if
    /// the backing `Vec` is already that large.
    pub fn ensure_capacity(&mut self, min_capacity: usize) {
        macro_rules! reserve_to {
            ($v:expr) => {{
                let v = $v;
                if v.capacity() < min_capacity {
                    let shortfall = min_capacity.saturating_sub(v.len());
                    v.reserve(shortfall);
                }
            }};
        }
        match self {
            GrowableColumn::I8(v) => reserve_to!(v),
            GrowableColumn::I16(v) => reserve_to!(v),
            GrowableColumn::I32(v) => reserve_to!(v),
            GrowableColumn::U8(v) => reserve_to!(v),
            GrowableColumn::U16(v) => reserve_to!(v),
            GrowableColumn::U32(v) => reserve_to!(v),
            GrowableColumn::F32(v) => reserve_to!(v),
            GrowableColumn::F64(v) => reserve_to!(v),
        }
    }

    /// Appends `count` elements from `src` starting at `offset`, used when an
    /// archetype transition moves a contiguous block of rows in bulk rather
    /// than one at a time. Precondition: `src` has the same element type as
    /// `self`, and `[offset, offset + count)` is within `src`'s bounds.
    pub fn bulk_append(&mut self, src: &GrowableColumn, offset: usize, count: usize) {
        macro_rules! append_variant {
            ($dst:expr, $src_variant:pat => $src_vec:ident) => {
                match src {
                    $src_variant => $dst.extend_from_slice(&$src_vec[offset..offset + count]),
                    _ => crate::error::assert_precondition(false, "bulk_append: element type mismatch"),
                }
            };
        }
        match self {
            GrowableColumn::I8(v) => append_variant!(v, GrowableColumn::I8(s) => s),
            GrowableColumn::I16(v) => append_variant!(v, GrowableColumn::I16(s) => s),
            GrowableColumn::I32(v) => append_variant!(v, GrowableColumn::I32(s) => s),
            GrowableColumn::U8(v) => append_variant!(v, GrowableColumn::U8(s) => s),
            GrowableColumn::U16(v) => append_variant!(v, GrowableColumn::U16(s) => s),
            GrowableColumn::U32(v) => append_variant!(v, GrowableColumn::U32(s) => s),
            GrowableColumn::F32(v) => append_variant!(v, GrowableColumn::F32(s) => s),
            GrowableColumn::F64(v) => append_variant!(v, GrowableColumn::F64(s) => s),
        }
    }

    /// Zero-copy window over the live `[0, len)` region of this column.
    /// Invalidated by any subsequent `push`/`bulk_append` that reallocates —
    /// callers must not retain it across such a call.
    pub fn view(&self) -> ColumnView<'_> {
        match self {
            GrowableColumn::I8(v) => ColumnView::I8(v.as_slice()),
            GrowableColumn::I16(v) => ColumnView::I16(v.as_slice()),
            GrowableColumn::I32(v) => ColumnView::I32(v.as_slice()),
            GrowableColumn::U8(v) => ColumnView::U8(v.as_slice()),
            GrowableColumn::U16(v) => ColumnView::U16(v.as_slice()),
            GrowableColumn::U32(v) => ColumnView::U32(v.as_slice()),
            GrowableColumn::F32(v) => ColumnView::F32(v.as_slice()),
            GrowableColumn::F64(v) => ColumnView::F64(v.as_slice()),
        }
    }

    /// Appends `count` zero-valued elements, used when rows are moved in
    /// bulk and the destination component didn't exist at the source.
    pub fn bulk_append_zeroes(&mut self, count: usize) {
        match self {
            GrowableColumn::I8(v) => v.resize(v.len() + count, 0),
            GrowableColumn::I16(v) => v.resize(v.len() + count, 0),
            GrowableColumn::I32(v) => v.resize(v.len() + count, 0),
            GrowableColumn::U8(v) => v.resize(v.len() + count, 0),
            GrowableColumn::U16(v) => v.resize(v.len() + count, 0),
            GrowableColumn::U32(v) => v.resize(v.len() + count, 0),
            GrowableColumn::F32(v) => v.resize(v.len() + count, 0.0),
            GrowableColumn::F64(v) => v.resize(v.len() + count, 0.0),
        }
    }

    /// Pushes `value`. Returns [`EcsError::ElementTypeMismatch`] if `value`'s
    /// type doesn't match this column's element type (the checked analogue
    /// of a negative value landing in an unsigned column).
    pub fn push(&mut self, value: FieldValue) -> Result<(), EcsError> {
        let expected = self.element_type();
        macro_rules! push_variant {
            ($vec:expr, $pat:pat => $val:expr) => {
                match value {
                    $pat => {
                        $vec.push($val);
                        Ok(())
                    }
                    _ => Err(value_type_mismatch(expected, value.element_type())),
                }
            };
        }
        match self {
            GrowableColumn::I8(v) => push_variant!(v, FieldValue::I8(x) => x),
            GrowableColumn::I16(v) => push_variant!(v, FieldValue::I16(x) => x),
            GrowableColumn::I32(v) => push_variant!(v, FieldValue::I32(x) => x),
            GrowableColumn::U8(v) => push_variant!(v, FieldValue::U8(x) => x),
            GrowableColumn::U16(v) => push_variant!(v, FieldValue::U16(x) => x),
            GrowableColumn::U32(v) => push_variant!(v, FieldValue::U32(x) => x),
            GrowableColumn::F32(v) => push_variant!(v, FieldValue::F32(x) => x),
            GrowableColumn::F64(v) => push_variant!(v, FieldValue::F64(x) => x),
        }
    }

    pub fn push_default(&mut self) {
        match self {
            GrowableColumn::I8(v) => v.push(0),
            GrowableColumn::I16(v) => v.push(0),
            GrowableColumn::I32(v) => v.push(0),
            GrowableColumn::U8(v) => v.push(0),
            GrowableColumn::U16(v) => v.push(0),
            GrowableColumn::U32(v) => v.push(0),
            GrowableColumn::F32(v) => v.push(0.0),
            GrowableColumn::F64(v) => v.push(0.0),
        }
    }

    pub fn pop(&mut self) -> Option<FieldValue> {
        match self {
            GrowableColumn::I8(v) => v.pop().map(FieldValue::I8),
            GrowableColumn::I16(v) => v.pop().map(FieldValue::I16),
            GrowableColumn::I32(v) => v.pop().map(FieldValue::I32),
            GrowableColumn::U8(v) => v.pop().map(FieldValue::U8),
            GrowableColumn::U16(v) => v.pop().map(FieldValue::U16),
            GrowableColumn::U32(v) => v.pop().map(FieldValue::U32),
            GrowableColumn::F32(v) => v.pop().map(FieldValue::F32),
            GrowableColumn::F64(v) => v.pop().map(FieldValue::F64),
        }
    }

    pub fn get(&self, row: usize) -> Option<FieldValue> {
        match self {
            GrowableColumn::I8(v) => v.get(row).copied().map(FieldValue::I8),
            GrowableColumn::I16(v) => v.get(row).copied().map(FieldValue::I16),
            GrowableColumn::I32(v) => v.get(row).copied().map(FieldValue::I32),
            GrowableColumn::U8(v) => v.get(row).copied().map(FieldValue::U8),
            GrowableColumn::U16(v) => v.get(row).copied().map(FieldValue::U16),
            GrowableColumn::U32(v) => v.get(row).copied().map(FieldValue::U32),
            GrowableColumn::F32(v) => v.get(row).copied().map(FieldValue::F32),
            GrowableColumn::F64(v) => v.get(row).copied().map(FieldValue::F64),
        }
    }

    /// Reads `row` as an `f64`, regardless of the column's storage type.
    /// Used for tag-data reads where there is nothing to read — callers on
    /// a tag component get `f64::NAN` rather than a raised error, since
    /// absence of data is a legitimate, non-exceptional outcome here.
    pub fn get_as_f64(&self, row: usize) -> f64 {
        match self.get(row) {
            Some(FieldValue::I8(x)) => x as f64,
            Some(FieldValue::I16(x)) => x as f64,
            Some(FieldValue::I32(x)) => x as f64,
            Some(FieldValue::U8(x)) => x as f64,
            Some(FieldValue::U16(x)) => x as f64,
            Some(FieldValue::U32(x)) => x as f64,
            Some(FieldValue::F32(x)) => x as f64,
            Some(FieldValue::F64(x)) => x,
            None => f64::NAN,
        }
    }

    /// Writes `value` at `row`. Returns [`EcsError::ElementTypeMismatch`] if
    /// `value`'s type doesn't match this column's element type.
    pub fn set_at(&mut self, row: usize, value: FieldValue) -> Result<(), EcsError> {
        let expected = self.element_type();
        macro_rules! set_variant {
            ($vec:expr, $pat:pat => $val:expr) => {
                match value {
                    $pat => {
                        $vec[row] = $val;
                        Ok(())
                    }
                    _ => Err(value_type_mismatch(expected, value.element_type())),
                }
            };
        }
        match self {
            GrowableColumn::I8(v) => set_variant!(v, FieldValue::I8(x) => x),
            GrowableColumn::I16(v) => set_variant!(v, FieldValue::I16(x) => x),
            GrowableColumn::I32(v) => set_variant!(v, FieldValue::I32(x) => x),
            GrowableColumn::U8(v) => set_variant!(v, FieldValue::U8(x) => x),
            GrowableColumn::U16(v) => set_variant!(v, FieldValue::U16(x) => x),
            GrowableColumn::U32(v) => set_variant!(v, FieldValue::U32(x) => x),
            GrowableColumn::F32(v) => set_variant!(v, FieldValue::F32(x) => x),
            GrowableColumn::F64(v) => set_variant!(v, FieldValue::F64(x) => x),
        }
    }

    /// Precondition: `row < self.len()`.
    pub fn swap_remove(&mut self, row: usize) -> FieldValue {
        crate::error::assert_precondition(row < self.len(), "swap_remove row out of bounds");
        match self {
            GrowableColumn::I8(v) => FieldValue::I8(v.swap_remove(row)),
            GrowableColumn::I16(v) => FieldValue::I16(v.swap_remove(row)),
            GrowableColumn::I32(v) => FieldValue::I32(v.swap_remove(row)),
            GrowableColumn::U8(v) => FieldValue::U8(v.swap_remove(row)),
            GrowableColumn::U16(v) => FieldValue::U16(v.swap_remove(row)),
            GrowableColumn::U32(v) => FieldValue::U32(v.swap_remove(row)),
            GrowableColumn::F32(v) => FieldValue::F32(v.swap_remove(row)),
            GrowableColumn::F64(v) => FieldValue::F64(v.swap_remove(row)),
        }
    }

    /// Copies the value at `src_row` into `dst_row`. Both rows must exist.
    pub fn copy_within(&mut self, src_row: usize, dst_row: usize) {
        macro_rules! copy_within_variant {
            ($v:expr) => {{
                let value = $v[src_row];
                $v[dst_row] = value;
            }};
        }
        match self {
            GrowableColumn::I8(v) => copy_within_variant!(v),
            GrowableColumn::I16(v) => copy_within_variant!(v),
            GrowableColumn::I32(v) => copy_within_variant!(v),
            GrowableColumn::U8(v) => copy_within_variant!(v),
            GrowableColumn::U16(v) => copy_within_variant!(v),
            GrowableColumn::U32(v) => copy_within_variant!(v),
            GrowableColumn::F32(v) => copy_within_variant!(v),
            GrowableColumn::F64(v) => copy_within_variant!(v),
        }
    }
}

/// Borrowed, zero-copy view over one column's live elements. Mirrors
/// [`GrowableColumn`]'s variants without owning the backing storage.
#[derive(Debug, Copy, Clone)]
pub enum ColumnView<'a> {
    I8(&'a [i8]),
    I16(&'a [i16]),
    I32(&'a [i32]),
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl<'a> ColumnView<'a> {
    pub fn len(&self) -> usize {
        match self {
            ColumnView::I8(s) => s.len(),
            ColumnView::I16(s) => s.len(),
            ColumnView::I32(s) => s.len(),
            ColumnView::U8(s) => s.len(),
            ColumnView::U16(s) => s.len(),
            ColumnView::U32(s) => s.len(),
            ColumnView::F32(s) => s.len(),
            ColumnView::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the low-level type-mismatch error for a column operation. Columns
/// have no notion of which component or field they belong to (that mapping
/// lives one layer up, in the archetype's column group); callers that do
/// have that context — `Archetype::write_fields` — translate this into a
/// component/field-scoped [`EcsError::ValidationFailure`] instead of
/// propagating it as-is.
fn value_type_mismatch(expected: ElementType, actual: ElementType) -> EcsError {
    EcsError::ElementTypeMismatch { expected, actual }
}

/// The ordered set of columns backing one component within one archetype,
/// plus the name/type layout needed to resolve a field to a column index.
#[derive(Debug, Clone)]
pub struct ColumnGroup {
    columns: Vec<GrowableColumn>,
    field_index: HashMap<&'static str, usize>,
}

impl ColumnGroup {
    pub fn from_schema(schema: &ComponentSchema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| GrowableColumn::new(f.element_type))
            .collect();
        let field_index = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();
        ColumnGroup {
            columns,
            field_index,
        }
    }

    /// Field name -> column index, mirroring the schema this group was built
    /// from. Lets a caller resolve a field by name without re-threading the
    /// `ComponentSchema` back through the archetype.
    #[inline]
    pub fn field_index(&self) -> &HashMap<&'static str, usize> {
        &self.field_index
    }

    #[inline]
    pub fn columns(&self) -> &[GrowableColumn] {
        &self.columns
    }

    #[inline]
    pub fn columns_mut(&mut self) -> &mut [GrowableColumn] {
        &mut self.columns
    }

    #[inline]
    pub fn column(&self, field_index: usize) -> Option<&GrowableColumn> {
        self.columns.get(field_index)
    }

    #[inline]
    pub fn column_mut(&mut self, field_index: usize) -> Option<&mut GrowableColumn> {
        self.columns.get_mut(field_index)
    }

    /// Logical row count; all columns in a group are kept in lockstep so any
    /// one of them reports the group's length.
    pub fn len(&self) -> usize {
        self.columns.first().map(GrowableColumn::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_default_row(&mut self) {
        for column in &mut self.columns {
            column.push_default();
        }
    }

    pub fn swap_remove_row(&mut self, row: usize) {
        for column in &mut self.columns {
            column.swap_remove(row);
        }
    }

    pub fn copy_row_within(&mut self, dst_row: usize, src_row: usize) {
        for column in &mut self.columns {
            column.copy_within(src_row, dst_row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentId, Field};

    fn xy_schema() -> ComponentSchema {
        ComponentSchema::new(
            ComponentId::new(0),
            vec![
                Field::new("x", ElementType::I32),
                Field::new("y", ElementType::F32),
            ],
        )
    }

    #[test]
    fn push_and_read_back() {
        let mut col = GrowableColumn::new(ElementType::I32);
        col.push(FieldValue::I32(42)).unwrap();
        assert_eq!(col.get(0), Some(FieldValue::I32(42)));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn push_type_mismatch_is_rejected() {
        let mut col = GrowableColumn::new(ElementType::U32);
        let err = col.push(FieldValue::I32(-1)).unwrap_err();
        assert_eq!(
            err,
            EcsError::ElementTypeMismatch {
                expected: ElementType::U32,
                actual: ElementType::I32,
            }
        );
    }

    #[test]
    fn swap_remove_moves_last_into_hole() {
        let mut col = GrowableColumn::new(ElementType::I32);
        col.push(FieldValue::I32(10)).unwrap();
        col.push(FieldValue::I32(20)).unwrap();
        col.push(FieldValue::I32(30)).unwrap();
        let removed = col.swap_remove(0);
        assert_eq!(removed, FieldValue::I32(10));
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0), Some(FieldValue::I32(30)));
        assert_eq!(col.get(1), Some(FieldValue::I32(20)));
    }

    #[test]
    fn view_reflects_live_elements() {
        let mut col = GrowableColumn::new(ElementType::F32);
        col.push(FieldValue::F32(1.0)).unwrap();
        col.push(FieldValue::F32(2.0)).unwrap();
        match col.view() {
            ColumnView::F32(slice) => assert_eq!(slice, &[1.0, 2.0]),
            other => panic!("unexpected view variant: {other:?}"),
        }
    }

    #[test]
    fn bulk_append_copies_a_range_from_another_column() {
        let mut src = GrowableColumn::new(ElementType::I32);
        for v in [10, 20, 30, 40] {
            src.push(FieldValue::I32(v)).unwrap();
        }
        let mut dst = GrowableColumn::new(ElementType::I32);
        dst.push(FieldValue::I32(0)).unwrap();
        dst.bulk_append(&src, 1, 2);
        assert_eq!(dst.len(), 3);
        assert_eq!(dst.get(1), Some(FieldValue::I32(20)));
        assert_eq!(dst.get(2), Some(FieldValue::I32(30)));
    }

    #[test]
    fn field_index_resolves_names_to_column_positions() {
        let group = ColumnGroup::from_schema(&xy_schema());
        assert_eq!(group.field_index().get("x"), Some(&0));
        assert_eq!(group.field_index().get("y"), Some(&1));
        assert_eq!(group.field_index().get("z"), None);
    }

    #[test]
    fn tag_schema_produces_empty_column_group() {
        let tag = ComponentSchema::tag(ComponentId::new(5));
        let group = ColumnGroup::from_schema(&tag);
        assert_eq!(group.columns().len(), 0);
        assert_eq!(group.len(), 0);
    }

    #[test]
    fn column_group_rows_stay_in_lockstep() {
        let mut group = ColumnGroup::from_schema(&xy_schema());
        group.push_default_row();
        group.push_default_row();
        assert_eq!(group.len(), 2);
        for c in group.columns() {
            assert_eq!(c.len(), 2);
        }
        group.swap_remove_row(0);
        for c in group.columns() {
            assert_eq!(c.len(), 1);
        }
    }
}
