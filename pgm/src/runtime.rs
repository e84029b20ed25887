//! The boundary to an imaging runtime that owns image memory.
//!
//! A runtime receives decoded buffers by value together with their unit addressing, and hands out
//! read-only mappings of its own images whose addressing it chooses freely. This crate never
//! constructs graphs or runs them; it only supplies and consumes pixel memory.
use std::io::Write;

use crate::buffer::PixelBuffer;
use crate::encode::Encoder;
use crate::error::Error;
use crate::layout::{AddressingDescriptor, PatchRef};

/// A read-only mapping of a runtime image.
///
/// The description is as reported by the runtime and has not been validated. Use
/// [`Self::patch`] to check it against the mapped bytes before reading any sample.
#[derive(Clone, Copy, Debug)]
pub struct MappedImage<'a> {
    pub width: u32,
    pub height: u32,
    pub addressing: AddressingDescriptor,
    pub data: &'a [u8],
}

impl<'a> MappedImage<'a> {
    /// Validate the mapping and view it as a patch.
    pub fn patch(&self) -> Result<PatchRef<'a>, Error> {
        Ok(PatchRef::with_addressing(
            self.width,
            self.height,
            self.addressing,
            self.data,
        )?)
    }
}

/// An imaging runtime that can adopt host memory and expose its images for reading.
pub trait ImagingRuntime {
    /// A handle to an image owned by the runtime.
    type Image;
    /// The errors of the runtime, which must be able to carry those of the codec.
    type Error: From<Error>;

    /// Take ownership of a host buffer, described by the given addressing.
    ///
    /// The runtime may alias the samples without copying them.
    fn import_host(
        &mut self,
        buffer: PixelBuffer,
        addressing: AddressingDescriptor,
    ) -> Result<Self::Image, Self::Error>;

    /// Map an image for reading.
    ///
    /// The mapping is only borrowed, it ends before the runtime can be used mutably again.
    fn map(&self, image: &Self::Image) -> Result<MappedImage<'_>, Self::Error>;

    /// Hand a decoded buffer to the runtime under its unit addressing.
    fn import(&mut self, buffer: PixelBuffer) -> Result<Self::Image, Self::Error> {
        let addressing = buffer.addressing();
        self.import_host(buffer, addressing)
    }
}

/// Map an image of a runtime and write it as a binary PGM stream.
pub fn write_image<T, W>(runtime: &T, image: &T::Image, writer: W) -> Result<(), T::Error>
where
    T: ImagingRuntime + ?Sized,
    W: Write,
{
    let mapped = runtime.map(image)?;
    let patch = mapped.patch()?;
    Encoder::new(writer).encode(&patch)?;
    Ok(())
}
