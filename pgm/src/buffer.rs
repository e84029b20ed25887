//! Owned, densely packed sample buffers.
use core::fmt;
use core::ops::{Index, IndexMut};

use crate::error::Error;
use crate::layout::{AddressingDescriptor, PatchLayout, PatchRef};

/// A matrix of 8-bit samples, packed row after row without any padding.
///
/// This is what the decoder produces. The invariants are that both dimensions are non-zero, fit a
/// signed 32-bit stride, and that there are exactly `width * height` samples. The buffer can be
/// handed to an imaging runtime by value, see [`crate::ImagingRuntime::import`], which may then
/// alias the samples without copying them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// The largest supported width or height.
    pub const MAX_DIMENSION: u32 = i32::MAX as u32;

    /// Wrap existing samples.
    ///
    /// Returns `None` if the dimensions are not supported or the sample count does not match them
    /// exactly.
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Option<Self> {
        let len = Self::sample_count(width, height)?;
        if samples.len() != len {
            return None;
        }

        Some(PixelBuffer {
            width,
            height,
            samples,
        })
    }

    /// Allocate a buffer of zeroed samples.
    ///
    /// Unlike most allocations this does not abort the process when memory is exhausted but
    /// reports [`Error::OutOfMemory`].
    pub fn try_zeroed(width: u32, height: u32) -> Result<Self, Error> {
        let (mut samples, len) = Self::reserve(width, height)?;
        samples.resize(len, 0);
        Ok(Self::from_filled(width, height, samples))
    }

    /// An empty vector with room for exactly `width * height` samples, and that count.
    ///
    /// None of the memory is touched, pages are only committed once samples are written.
    pub(crate) fn reserve(width: u32, height: u32) -> Result<(Vec<u8>, usize), Error> {
        let bytes = u64::from(width) * u64::from(height);
        let len = Self::sample_count(width, height).ok_or(Error::OutOfMemory { bytes })?;

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { bytes })?;
        Ok((samples, len))
    }

    /// Wrap samples produced for a [`Self::reserve`]d buffer of the same dimensions.
    pub(crate) fn from_filled(width: u32, height: u32, samples: Vec<u8>) -> Self {
        debug_assert_eq!(Some(samples.len()), Self::sample_count(width, height));
        PixelBuffer {
            width,
            height,
            samples,
        }
    }

    fn sample_count(width: u32, height: u32) -> Option<usize> {
        let valid = 1..=Self::MAX_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return None;
        }

        usize::try_from(u64::from(width) * u64::from(height)).ok()
    }

    /// Get the width of this buffer.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of this buffer.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Unwrap the samples, in row-major order.
    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Get the sample at a coordinate, if it is within the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.samples[self.index_of(x, y)])
        } else {
            None
        }
    }

    /// The unit addressing of this buffer: unit strides and scales, single steps.
    ///
    /// This is the overlay under which the samples are handed to a runtime.
    pub fn addressing(&self) -> AddressingDescriptor {
        // The width fits by the invariant of this type.
        AddressingDescriptor::row_major(self.width as i32)
    }

    /// Overlay the unit addressing onto the samples, without copying them.
    pub fn overlay(&self) -> PatchRef<'_> {
        PatchRef {
            layout: PatchLayout::dense(self.width, self.height, self.samples.len()),
            data: &self.samples,
        }
    }

    fn index_of(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Index<(u32, u32)> for PixelBuffer {
    type Output = u8;

    fn index(&self, (x, y): (u32, u32)) -> &u8 {
        assert!(x < self.width && y < self.height, "Sample out of bounds");
        &self.samples[self.index_of(x, y)]
    }
}

impl IndexMut<(u32, u32)> for PixelBuffer {
    fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut u8 {
        assert!(x < self.width && y < self.height, "Sample out of bounds");
        let index = self.index_of(x, y);
        &mut self.samples[index]
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("samples", &self.samples.len())
            .finish()
    }
}

#[test]
fn sample_count_must_match() {
    assert!(PixelBuffer::from_samples(2, 2, vec![0; 4]).is_some());
    assert!(PixelBuffer::from_samples(2, 2, vec![0; 5]).is_none());
    assert!(PixelBuffer::from_samples(0, 0, vec![]).is_none());
    assert!(PixelBuffer::from_samples(1 << 31, 1, vec![]).is_none());
}

#[test]
fn unit_overlay() {
    let mut buffer = PixelBuffer::try_zeroed(3, 2).expect("Small allocation");
    buffer[(2, 1)] = 7;
    assert_eq!(buffer.as_slice(), &[0, 0, 0, 0, 0, 7]);

    let addressing = buffer.addressing();
    assert_eq!(addressing, AddressingDescriptor::unit(3).unwrap());
    assert_eq!((addressing.stride_x, addressing.stride_y), (1, 3));
    assert_eq!((addressing.step_x, addressing.step_y), (1, 1));

    let overlay = buffer.overlay();
    assert_eq!(overlay.layout().byte_len(), 6);
    assert_eq!(overlay.get(2, 1), Some(7));
    assert_eq!(overlay.contiguous_row(1), Some(&[0u8, 0, 7][..]));
}

#[test]
fn reserved_but_untouched() {
    let (samples, len) = PixelBuffer::reserve(4096, 4096).expect("Moderate reservation");
    assert_eq!(len, 1 << 24);
    assert!(samples.is_empty());
    assert!(samples.capacity() >= len);
}

#[test]
fn unreasonable_allocation() {
    let max = PixelBuffer::MAX_DIMENSION;
    assert!(matches!(
        PixelBuffer::try_zeroed(max, max),
        Err(Error::OutOfMemory { .. })
    ));
}
