//! Byte views of typed cell data for message buffers.
//!
//! All packing and unpacking of cell data goes through these helpers; the
//! `bytemuck::Pod` bound keeps the casts free of undefined behaviour. The
//! typed side is always the side being cast (a `&[T]` viewed as bytes),
//! so buffer alignment never matters.

use bytemuck::Pod;

/// View a typed slice as its raw bytes.
#[inline]
pub fn cast_bytes<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// View a typed slice as its raw bytes, mutably.
#[inline]
pub fn cast_bytes_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_f64() {
        let vals = [1.5f64, -2.25, 0.0];
        let bytes = cast_bytes(&vals).to_vec();
        let mut out = [0.0f64; 3];
        cast_bytes_mut(&mut out).copy_from_slice(&bytes);
        assert_eq!(out, vals);
    }

    #[test]
    fn lengths_scale_by_element_size() {
        let vals = [0u32; 4];
        assert_eq!(cast_bytes(&vals).len(), 16);
    }
}
