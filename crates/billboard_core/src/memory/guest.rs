//! # Guest Memory View
//!
//! Typed access to the simulated program's flat address space.
//!
//! ## Layout
//!
//! The host keeps every aligned 32-bit guest word in its own (little-endian)
//! byte order. Narrower accesses are swizzled inside the word:
//!
//! ```text
//! guest byte  A   →  host byte  A ^ 3
//! guest half  A   →  host half  A ^ 2
//! guest word  A   →  host word  A
//! ```
//!
//! Records uploaded with [`GuestMemory::write_pod_slice`] are therefore laid out in
//! host word order already (see `ExtendedVertex` in `billboard_shared`).

use std::fmt;

use bytemuck::Pod;

use crate::error::{CoreError, CoreResult};

/// Base of the direct-mapped segment; virtual `KSEG0_BASE` is physical 0.
pub const KSEG0_BASE: u32 = 0x8000_0000;

/// A 32-bit virtual address as seen by the simulated program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestAddr(pub u32);

impl GuestAddr {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Wraps a raw virtual address.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Sign-extends a 64-bit register value into a 32-bit virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_register(reg: u64) -> Self {
        Self(reg as u32)
    }

    /// Returns the raw virtual address.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true for the null pointer.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Adds a byte offset with 32-bit wraparound.
    #[inline]
    #[must_use]
    pub const fn offset(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }

    /// Physical offset under the fixed segment bias, before bounds checks.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn physical(self) -> u32 {
        (self.0 as i32).wrapping_sub(KSEG0_BASE as i32) as u32
    }
}

impl fmt::Display for GuestAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Borrowed view of guest memory for the duration of one hook call.
pub struct GuestMemory<'a> {
    data: &'a mut [u8],
}

impl<'a> GuestMemory<'a> {
    /// Wraps the host's guest buffer.
    #[must_use]
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Size of the buffer in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Translates a virtual address into a buffer offset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    #[inline]
    pub fn translate(&self, addr: GuestAddr) -> CoreResult<usize> {
        self.span(addr, 1)
    }

    /// Validates that `len` bytes starting at `addr` are inside the buffer.
    fn span(&self, addr: GuestAddr, len: usize) -> CoreResult<usize> {
        let phys = addr.physical() as usize;
        match phys.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(phys),
            _ => Err(CoreError::OutOfRange {
                address: addr,
                len,
                size: self.data.len(),
            }),
        }
    }

    /// Word-aligned host offset containing the guest bytes at `addr`.
    fn word_span(&self, addr: GuestAddr) -> CoreResult<usize> {
        let phys = self.span(addr, 1)?;
        let word = phys & !3;
        if word + 4 > self.data.len() {
            return Err(CoreError::OutOfRange {
                address: addr,
                len: 4,
                size: self.data.len(),
            });
        }
        Ok(phys)
    }

    /// Swizzled host offset of the halfword at `addr`, both bytes in bounds.
    fn half_span(&self, addr: GuestAddr) -> CoreResult<usize> {
        let host = self.word_span(addr)? ^ 2;
        if host + 2 > self.data.len() {
            return Err(CoreError::OutOfRange {
                address: addr,
                len: 2,
                size: self.data.len(),
            });
        }
        Ok(host)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn read_u8(&self, addr: GuestAddr) -> CoreResult<u8> {
        let phys = self.word_span(addr)?;
        Ok(self.data[phys ^ 3])
    }

    /// Reads a halfword.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn read_u16(&self, addr: GuestAddr) -> CoreResult<u16> {
        let phys = self.half_span(addr)?;
        Ok(u16::from_le_bytes([self.data[phys], self.data[phys + 1]]))
    }

    /// Reads a signed halfword.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_i16(&self, addr: GuestAddr) -> CoreResult<i16> {
        self.read_u16(addr).map(|v| v as i16)
    }

    /// Reads a word.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn read_u32(&self, addr: GuestAddr) -> CoreResult<u32> {
        let phys = self.span(addr, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[phys..phys + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a signed word.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_i32(&self, addr: GuestAddr) -> CoreResult<i32> {
        self.read_u32(addr).map(|v| v as i32)
    }

    /// Reads a word and reinterprets its bits as `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn read_f32(&self, addr: GuestAddr) -> CoreResult<f32> {
        self.read_u32(addr).map(f32::from_bits)
    }

    /// Writes a halfword.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn write_u16(&mut self, addr: GuestAddr, value: u16) -> CoreResult<()> {
        let phys = self.half_span(addr)?;
        self.data[phys..phys + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a word.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn write_u32(&mut self, addr: GuestAddr, value: u32) -> CoreResult<()> {
        let phys = self.span(addr, 4)?;
        self.data[phys..phys + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes the bits of an `f32` as a word.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the address falls outside the buffer.
    pub fn write_f32(&mut self, addr: GuestAddr, value: f32) -> CoreResult<()> {
        self.write_u32(addr, value.to_bits())
    }

    /// Copies a slice of word-structured records into guest memory as-is.
    ///
    /// Nothing is written unless the whole slice fits.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the slice does not fit.
    pub fn write_pod_slice<T: Pod>(&mut self, addr: GuestAddr, values: &[T]) -> CoreResult<()> {
        self.write_bytes(addr, bytemuck::cast_slice(values))
    }

    fn write_bytes(&mut self, addr: GuestAddr, bytes: &[u8]) -> CoreResult<()> {
        let phys = self.span(addr, bytes.len())?;
        self.data[phys..phys + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rdram() -> Vec<u8> {
        vec![0u8; 0x1000]
    }

    #[test]
    fn test_translate_bias() {
        let mut buf = rdram();
        let mem = GuestMemory::new(&mut buf);
        assert_eq!(mem.translate(GuestAddr(0x8000_0000)).unwrap(), 0);
        assert_eq!(mem.translate(GuestAddr(0x8000_0FFF)).unwrap(), 0xFFF);
    }

    #[test]
    fn test_translate_rejects_out_of_range() {
        let mut buf = rdram();
        let mem = GuestMemory::new(&mut buf);
        assert!(mem.translate(GuestAddr(0x8000_1000)).is_err());
        // Below the segment base wraps to a huge physical offset.
        assert!(mem.translate(GuestAddr(0x7FFF_FFFC)).is_err());
        assert!(mem.translate(GuestAddr::NULL).is_err());
    }

    #[test]
    fn test_word_straddling_end_is_rejected() {
        let mut buf = rdram();
        let mem = GuestMemory::new(&mut buf);
        let err = mem.read_u32(GuestAddr(0x8000_0FFE)).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { len: 4, .. }));
    }

    #[test]
    fn test_odd_halfword_in_last_word_is_rejected() {
        let mut buf = vec![0u8; 16];
        let mut mem = GuestMemory::new(&mut buf);
        let addr = GuestAddr(0x8000_000D);
        assert!(mem.translate(addr).is_ok());

        let err = mem.read_u16(addr).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { len: 2, .. }));
        assert!(mem.read_i16(addr).is_err());
        assert!(mem.write_u16(addr, 0xFFFF).is_err());
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_halfword_swizzle() {
        let mut buf = rdram();
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(GuestAddr(0x8000_0010), 0x1122_3344).unwrap();
        // Guest is big-endian: the upper half lives at the lower address.
        assert_eq!(mem.read_u16(GuestAddr(0x8000_0010)).unwrap(), 0x1122);
        assert_eq!(mem.read_u16(GuestAddr(0x8000_0012)).unwrap(), 0x3344);
        assert_eq!(mem.read_u8(GuestAddr(0x8000_0013)).unwrap(), 0x44);

        mem.write_u16(GuestAddr(0x8000_0012), 0xABCD).unwrap();
        assert_eq!(mem.read_u32(GuestAddr(0x8000_0010)).unwrap(), 0x1122_ABCD);
    }

    #[test]
    fn test_f32_roundtrip_bits() {
        let mut buf = rdram();
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_f32(GuestAddr(0x8000_0020), 60.0).unwrap();
        assert_eq!(mem.read_u32(GuestAddr(0x8000_0020)).unwrap(), 60.0f32.to_bits());
    }

    #[test]
    fn test_write_pod_is_all_or_nothing() {
        let mut buf = rdram();
        let mut mem = GuestMemory::new(&mut buf);
        let words = [0xFFFF_FFFFu32; 4];
        assert!(mem.write_pod_slice(GuestAddr(0x8000_0FF8), &words).is_err());
        assert_eq!(mem.read_u32(GuestAddr(0x8000_0FF8)).unwrap(), 0);
    }

    #[test]
    fn test_offset_wraps() {
        assert_eq!(GuestAddr(0xFFFF_FFFC).offset(8), GuestAddr(4));
        assert_eq!(GuestAddr(0x8090_0000).offset(0x40).to_string(), "0x80900040");
    }
}
