//! Uniform buffer structures for the folding kernels.
//!
//! `#[repr(C)]` structs matching std140 layout. Uniforms are rebuilt from
//! the current input shape on every dispatch since shapes vary between
//! calls.

use bytemuck::{Pod, Zeroable};

/// Shape uniforms shared by all folding kernels.
///
/// # Layout
///
/// Total size: 16 bytes (1 × vec4), aligned to 16 bytes.
///
/// ```text
/// Offset  Size  Field
/// 0       4     rows
/// 4       4     cols
/// 8       4     half_rows
/// 12      4     _pad
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FoldUniforms {
    /// Input row count (N).
    pub rows: u32,
    /// Column count (M).
    pub cols: u32,
    /// N / 2, the output row count.
    pub half_rows: u32,
    /// Padding for vec4 alignment.
    pub _pad: u32,
}

impl FoldUniforms {
    /// Creates uniforms for an `(rows, cols)` input. `rows` must be even.
    pub fn new(rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows % 2, 0);
        Self {
            rows: rows as u32,
            cols: cols as u32,
            half_rows: (rows / 2) as u32,
            _pad: 0,
        }
    }

    /// Returns the size in bytes.
    pub const fn size_bytes() -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        // Must be one vec4.
        assert_eq!(FoldUniforms::size_bytes(), 16);
    }

    #[test]
    fn test_new() {
        let u = FoldUniforms::new(6, 4);
        assert_eq!(u.rows, 6);
        assert_eq!(u.cols, 4);
        assert_eq!(u.half_rows, 3);
    }

    #[test]
    fn test_pod_cast() {
        let u = FoldUniforms::new(4, 2);
        let bytes: &[u8] = bytemuck::bytes_of(&u);
        assert_eq!(bytes.len(), 16);
    }
}
