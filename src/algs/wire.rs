//! Byte views of halo messages.
//!
//! A message is the packed field values of one direction, sent in native
//! byte order: every rank of a job runs the same binary on the same kind of
//! node.

use crate::mesh_error::MeshHaloError;
use bytemuck::Pod;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Copy a received payload into `dst`, rejecting any length other than the
/// exact byte size of `dst`.
///
/// The payload may not be aligned for `T`, so values are copied byte-wise.
pub fn decode_into<T: Pod>(neighbor: usize, payload: &[u8], dst: &mut [T]) -> Result<(), MeshHaloError> {
    let expected = std::mem::size_of_val(dst);
    if payload.len() != expected {
        return Err(MeshHaloError::BufferSizeMismatch {
            neighbor,
            expected,
            got: payload.len(),
        });
    }
    cast_slice_mut(dst).copy_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_checks_length() {
        let src = [1.0f64, -2.5];
        let mut dst = [0.0f64; 2];
        decode_into(3, cast_slice(&src), &mut dst).unwrap();
        assert_eq!(dst, src);
        let err = decode_into(3, &cast_slice(&src)[..12], &mut dst).unwrap_err();
        assert!(matches!(
            err,
            MeshHaloError::BufferSizeMismatch {
                neighbor: 3,
                expected: 16,
                got: 12
            }
        ));
    }

    #[test]
    fn decode_rejects_oversized_payload() {
        let src = [1.0f64, -2.5, 7.0];
        let mut dst = [0.0f64; 2];
        let err = decode_into(5, cast_slice(&src), &mut dst).unwrap_err();
        assert!(matches!(
            err,
            MeshHaloError::BufferSizeMismatch {
                neighbor: 5,
                expected: 16,
                got: 24
            }
        ));
        assert_eq!(dst, [0.0, 0.0]);
    }
}
