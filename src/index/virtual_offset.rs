use std::fmt;

/// Largest compressed-block offset representable in a virtual offset (48 bits).
pub const MAX_BLOCK_OFFSET: u64 = (1 << 48) - 1;

/// Position inside a BGZF stream.
///
/// Bits 63-16 hold the offset of the compressed block start in the file,
/// bits 15-0 the offset inside the decompressed block. Ordering of the packed
/// value is lexicographic on `(block_offset, within_block_offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualOffset(u64);

impl VirtualOffset {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    /// Builds an offset from its components. `block_offset` must fit in 48 bits;
    /// higher bits are discarded.
    pub const fn new(block_offset: u64, within_block_offset: u16) -> Self {
        Self(((block_offset & MAX_BLOCK_OFFSET) << 16) | within_block_offset as u64)
    }

    pub const fn block_offset(self) -> u64 {
        self.0 >> 16
    }

    pub const fn within_block_offset(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for VirtualOffset {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<VirtualOffset> for u64 {
    fn from(offset: VirtualOffset) -> Self {
        offset.0
    }
}

impl fmt::Display for VirtualOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_offset(), self.within_block_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let offset = VirtualOffset::new(1024, 512);
        assert_eq!(offset.block_offset(), 1024);
        assert_eq!(offset.within_block_offset(), 512);
        assert_eq!(offset.as_raw(), (1024 << 16) | 512);
        assert_eq!(VirtualOffset::from(offset.as_raw()), offset);
    }

    #[test]
    fn test_lexicographic_ordering() {
        let a = VirtualOffset::new(1000, 100);
        let b = VirtualOffset::new(1000, 200);
        let c = VirtualOffset::new(2000, 0);

        assert!(a < b);
        assert!(b < c);
        assert!(VirtualOffset::new(999, u16::MAX) < a);
    }

    #[test]
    fn test_max_block_offset() {
        let offset = VirtualOffset::new(MAX_BLOCK_OFFSET, u16::MAX);
        assert_eq!(offset, VirtualOffset::MAX);
        assert_eq!(offset.block_offset(), MAX_BLOCK_OFFSET);
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualOffset::new(100, 7).to_string(), "100:7");
    }
}
