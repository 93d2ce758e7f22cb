//! Strided vector layouts for non-contiguous column transfers.
//!
//! A [`VectorLayout`] describes `count` single values spaced `stride` apart,
//! starting at `start`, in a flat buffer. It plays the role a derived
//! "vector" datatype plays in message-passing libraries: a column of a
//! row-major grid is one layout, packed into and unpacked from one message.

use bytemuck::cast_slice_mut;

use crate::heat_error::GridError;

/// `count` elements at `start + k * stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorLayout {
    pub start: usize,
    pub count: usize,
    pub stride: usize,
}

impl VectorLayout {
    pub fn new(start: usize, count: usize, stride: usize) -> Self {
        Self {
            start,
            count,
            stride,
        }
    }

    /// Flat index of the `k`-th element.
    #[inline]
    pub fn offset(&self, k: usize) -> usize {
        self.start + k * self.stride
    }

    /// Number of bytes this layout occupies on the wire.
    pub fn byte_len(&self) -> usize {
        self.count * std::mem::size_of::<f64>()
    }

    /// One past the last flat index touched.
    pub fn extent(&self) -> usize {
        if self.count == 0 {
            self.start
        } else {
            self.offset(self.count - 1) + 1
        }
    }

    fn check(&self, len: usize) -> Result<(), GridError> {
        if self.extent() > len {
            return Err(GridError::BufferLength {
                expected: self.extent(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// Read-only strided view.
#[derive(Debug, Clone, Copy)]
pub struct Strided<'a> {
    data: &'a [f64],
    layout: VectorLayout,
}

impl<'a> Strided<'a> {
    pub(crate) fn new(data: &'a [f64], layout: VectorLayout) -> Result<Self, GridError> {
        layout.check(data.len())?;
        Ok(Self { data, layout })
    }

    /// Caller guarantees the layout lies inside `data`.
    pub(crate) fn from_parts(data: &'a [f64], layout: VectorLayout) -> Self {
        debug_assert!(layout.extent() <= data.len());
        Self { data, layout }
    }

    pub fn len(&self) -> usize {
        self.layout.count
    }

    pub fn is_empty(&self) -> bool {
        self.layout.count == 0
    }

    pub fn layout(&self) -> VectorLayout {
        self.layout
    }

    pub fn get(&self, k: usize) -> Option<f64> {
        (k < self.layout.count).then(|| self.data[self.layout.offset(k)])
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        let data = self.data;
        let layout = self.layout;
        (0..layout.count).map(move |k| data[layout.offset(k)])
    }

    /// Pack into one contiguous message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let packed: Vec<f64> = self.iter().collect();
        bytemuck::cast_slice(&packed).to_vec()
    }
}

/// Mutable strided view.
#[derive(Debug)]
pub struct StridedMut<'a> {
    data: &'a mut [f64],
    layout: VectorLayout,
}

impl<'a> StridedMut<'a> {
    pub(crate) fn new(data: &'a mut [f64], layout: VectorLayout) -> Result<Self, GridError> {
        layout.check(data.len())?;
        Ok(Self { data, layout })
    }

    pub fn len(&self) -> usize {
        self.layout.count
    }

    pub fn is_empty(&self) -> bool {
        self.layout.count == 0
    }

    pub fn set(&mut self, k: usize, value: f64) {
        assert!(k < self.layout.count, "strided index {k} out of range");
        let at = self.layout.offset(k);
        self.data[at] = value;
    }

    pub fn fill(&mut self, value: f64) {
        for k in 0..self.layout.count {
            let at = self.layout.offset(k);
            self.data[at] = value;
        }
    }

    /// Unpack one contiguous message into the strided slots.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<(), GridError> {
        if bytes.len() != self.layout.byte_len() {
            return Err(GridError::BufferLength {
                expected: self.layout.count,
                actual: bytes.len() / std::mem::size_of::<f64>(),
            });
        }
        let mut packed = vec![0.0f64; self.layout.count];
        cast_slice_mut::<f64, u8>(&mut packed).copy_from_slice(bytes);
        for (k, v) in packed.into_iter().enumerate() {
            let at = self.layout.offset(k);
            self.data[at] = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_layout_walks_stride() {
        let data: Vec<f64> = (0..12u8).map(f64::from).collect();
        // column 1 of a 4-wide, 3-tall buffer
        let col = Strided::new(&data, VectorLayout::new(1, 3, 4)).unwrap();
        assert_eq!(col.iter().collect::<Vec<_>>(), vec![1.0, 5.0, 9.0]);
        assert_eq!(col.get(3), None);
    }

    #[test]
    fn layout_past_end_is_rejected() {
        let data = vec![0.0; 8];
        assert!(Strided::new(&data, VectorLayout::new(3, 3, 4)).is_err());
    }

    #[test]
    fn pack_then_unpack_into_other_column() {
        let src: Vec<f64> = (0..12u8).map(f64::from).collect();
        let mut dst = vec![0.0; 12];
        let bytes = Strided::new(&src, VectorLayout::new(2, 3, 4))
            .unwrap()
            .to_bytes();
        StridedMut::new(&mut dst, VectorLayout::new(0, 3, 4))
            .unwrap()
            .copy_from_bytes(&bytes)
            .unwrap();
        assert_eq!(dst[0], 2.0);
        assert_eq!(dst[4], 6.0);
        assert_eq!(dst[8], 10.0);
        assert_eq!(dst.iter().filter(|v| **v != 0.0).count(), 3);
    }

    #[test]
    fn short_message_is_an_error() {
        let mut dst = vec![0.0; 12];
        let mut col = StridedMut::new(&mut dst, VectorLayout::new(0, 3, 4)).unwrap();
        assert!(col.copy_from_bytes(&[0u8; 16]).is_err());
    }
}
