//! Fixed-size wire types for scatter/gather.
//!
//! Tile metadata travels as little-endian `u32` scalars, one message per
//! field. Tile payloads travel as the raw row-major `f64` buffer.

use bytemuck::{Pod, Zeroable};

/// Size of one metadata message.
pub const WIRE_U32_LEN: usize = std::mem::size_of::<WireU32>();

/// A `u32` stored pre-swapped to little-endian.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireU32(u32);

impl WireU32 {
    pub fn new(v: usize) -> Self {
        Self((v as u32).to_le())
    }

    pub fn get(self) -> usize {
        u32::from_le(self.0) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode a received metadata message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        expect_exact_len(bytes.len(), WIRE_U32_LEN)?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

/// View an `f64` buffer as bytes for sending.
pub fn f64_bytes(values: &[f64]) -> &[u8] {
    bytemuck::cast_slice(values)
}

/// Copy a received payload into an `f64` buffer of exactly matching size.
pub fn copy_f64s(bytes: &[u8], dst: &mut [f64]) -> Result<(), String> {
    expect_exact_len(bytes.len(), std::mem::size_of_val(dst))?;
    bytemuck::cast_slice_mut::<f64, u8>(dst).copy_from_slice(bytes);
    Ok(())
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_is_little_endian_on_the_wire() {
        let w = WireU32::new(0x0102_0304);
        assert_eq!(w.as_bytes(), &[4, 3, 2, 1]);
        assert_eq!(WireU32::from_bytes(&[4, 3, 2, 1]).unwrap().get(), 0x0102_0304);
        assert!(WireU32::from_bytes(&[1, 2]).is_err());
    }

    #[test]
    fn payload_copy_checks_size() {
        let src = [1.5f64, -2.0];
        let mut dst = [0.0f64; 2];
        copy_f64s(f64_bytes(&src), &mut dst).unwrap();
        assert_eq!(dst, src);
        let mut short = [0.0f64; 1];
        assert!(copy_f64s(f64_bytes(&src), &mut short).is_err());
    }
}
