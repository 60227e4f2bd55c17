//! Pack/unpack between field storage and flat message regions.
//!
//! A region holds `element_count` values per field, fields back to back in
//! the order the caller listed them. Packing and unpacking never allocate;
//! every field is checked against the highest index a layout touches before
//! the first value moves, so a short field fails without partial writes.

use crate::data::field::FieldAccess;
use crate::data::layout::BoundaryLayout;
use crate::mesh_error::MeshHaloError;
use crate::overlap::delta::Delta;

/// Fail with `FieldTooShort` unless every field length covers `layout`.
pub fn check_lengths<I>(layout: &BoundaryLayout, lens: I) -> Result<(), MeshHaloError>
where
    I: IntoIterator<Item = usize>,
{
    let needed = layout.max_index();
    for (field, len) in lens.into_iter().enumerate() {
        if needed >= len {
            return Err(MeshHaloError::FieldTooShort { field, needed, len });
        }
    }
    Ok(())
}

/// Write the boundary values of every field into `out`, field 0 first.
///
/// `out` must hold exactly `layout.element_count() * fields.len()` values.
pub fn pack_fields<T: Copy>(
    layout: &BoundaryLayout,
    fields: &[&dyn FieldAccess<T>],
    out: &mut [T],
) -> Result<(), MeshHaloError> {
    let count = layout.element_count();
    if out.len() != count * fields.len() {
        return Err(MeshHaloError::BufferOverflow {
            direction: layout.direction(),
            needed: count * fields.len(),
            capacity: out.len(),
        });
    }
    check_lengths(layout, fields.iter().map(|f| f.len()))?;
    for (field, chunk) in fields.iter().zip(out.chunks_exact_mut(count.max(1))) {
        for (k, slot) in chunk.iter_mut().enumerate() {
            *slot = field.get(layout.index(k));
        }
    }
    Ok(())
}

/// Fold `incoming` into the boundary values of every field with `D`.
pub fn unpack_fields<D, T>(
    layout: &BoundaryLayout,
    incoming: &[T],
    fields: &mut [&mut dyn FieldAccess<T>],
) -> Result<(), MeshHaloError>
where
    D: Delta<T>,
    T: Copy,
{
    let count = layout.element_count();
    if incoming.len() != count * fields.len() {
        return Err(MeshHaloError::BufferOverflow {
            direction: layout.direction(),
            needed: count * fields.len(),
            capacity: incoming.len(),
        });
    }
    check_lengths(layout, fields.iter().map(|f| f.len()))?;
    for (field, chunk) in fields.iter_mut().zip(incoming.chunks_exact(count.max(1))) {
        for (k, &value) in chunk.iter().enumerate() {
            let idx = layout.index(k);
            let mut local = field.get(idx);
            D::fuse(&mut local, value);
            field.set(idx, local);
        }
    }
    Ok(())
}

/// Copy `count` values per field into contiguous ghost storage, starting at
/// each field's cursor, and advance the cursors past what was written.
pub fn unpack_segmented<T: Copy>(
    count: usize,
    incoming: &[T],
    fields: &mut [&mut dyn FieldAccess<T>],
    cursors: &mut [usize],
) -> Result<(), MeshHaloError> {
    if cursors.len() != fields.len() {
        return Err(MeshHaloError::FieldCountMismatch {
            expected: fields.len(),
            got: cursors.len(),
        });
    }
    if incoming.len() != count * fields.len() {
        return Err(MeshHaloError::FieldCountMismatch {
            expected: fields.len(),
            got: incoming.len() / count.max(1),
        });
    }
    for (i, (f, &at)) in fields.iter().zip(cursors.iter()).enumerate() {
        if at + count > f.len() {
            return Err(MeshHaloError::FieldTooShort {
                field: i,
                needed: at + count - 1,
                len: f.len(),
            });
        }
    }
    for ((field, cursor), chunk) in fields
        .iter_mut()
        .zip(cursors.iter_mut())
        .zip(incoming.chunks_exact(count.max(1)))
    {
        for (k, &value) in chunk.iter().enumerate() {
            field.set(*cursor + k, value);
        }
        *cursor += count;
    }
    Ok(())
}
