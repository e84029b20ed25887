//! A runtime keeping all images in host memory.
//!
//! Imported buffers are adopted as they are, without a copy. Images the runtime allocates itself
//! get rows padded to [`ROW_ALIGN`] bytes, so that writing them back out exercises the strided
//! path of the encoder.
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use pgm::{
    AddressingDescriptor, ImagingRuntime, MappedImage, PatchLayout, PatchMut, PixelBuffer,
    SCALE_UNITY,
};

/// Row pitch alignment of runtime allocated images.
pub const ROW_ALIGN: u32 = 64;

/// A handle to an image of a [`HostRuntime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostImage(usize);

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Pgm(#[from] pgm::Error),
    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: pgm::Error,
    },
    #[error("unknown image handle {0:?}")]
    UnknownImage(HostImage),
    #[error("cannot allocate a {width}x{height} image")]
    OutOfMemory { width: u32, height: u32 },
    #[error("the graph has no input images")]
    NoInputs,
}

struct Slot {
    width: u32,
    height: u32,
    addressing: AddressingDescriptor,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct HostRuntime {
    images: Vec<Slot>,
}

impl HostRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed image with padded rows.
    pub fn create_image(&mut self, width: u32, height: u32) -> Result<HostImage, HostError> {
        let oom = || HostError::OutOfMemory { width, height };
        let pitch = (width > 0 && height > 0)
            .then(|| width.checked_next_multiple_of(ROW_ALIGN))
            .flatten()
            .and_then(|pitch| i32::try_from(pitch).ok())
            .ok_or_else(oom)?;

        let len = usize::try_from(i64::from(pitch) * i64::from(height))
            .map_err(|_| oom())?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| oom())?;
        data.resize(len, 0);

        let addressing = AddressingDescriptor {
            stride_x: 1,
            stride_y: pitch,
            scale_x: SCALE_UNITY,
            scale_y: SCALE_UNITY,
            step_x: 1,
            step_y: 1,
        };

        debug!("allocated {width}x{height} image with pitch {pitch}");
        Ok(self.insert(Slot {
            width,
            height,
            addressing,
            data,
        }))
    }

    /// Run the graph: output `i` becomes input `i mod n`, resampled to the output's size.
    pub fn process(&mut self, inputs: &[HostImage], outputs: &[HostImage]) -> Result<(), HostError> {
        if inputs.is_empty() {
            return Err(HostError::NoInputs);
        }

        for (i, &output) in outputs.iter().enumerate() {
            let source = inputs[i % inputs.len()];
            let samples = self.resample(source, output)?;

            let target = self.slot_mut(output)?;
            let layout = PatchLayout::new(target.width, target.height, target.addressing)
                .map_err(pgm::Error::from)?;
            let mut patch = PatchMut::new(layout, &mut target.data).map_err(pgm::Error::from)?;
            for (y, row) in (0..layout.height()).zip(samples.chunks(layout.width() as usize)) {
                patch.scatter_row(y, row);
            }
        }

        Ok(())
    }

    /// Nearest neighbour samples of `source` for every coordinate of `target`, row-major.
    fn resample(&self, source: HostImage, target: HostImage) -> Result<Vec<u8>, HostError> {
        let patch = self.map(&source)?.patch()?;
        let target = self.slot(target)?;

        let mut samples = Vec::with_capacity(target.width as usize * target.height as usize);
        for y in 0..target.height {
            let sy = scale_coordinate(y, target.height, patch.height());
            for x in 0..target.width {
                let sx = scale_coordinate(x, target.width, patch.width());
                samples.push(patch.get(sx, sy).unwrap_or(0));
            }
        }

        Ok(samples)
    }

    fn insert(&mut self, slot: Slot) -> HostImage {
        self.images.push(slot);
        HostImage(self.images.len() - 1)
    }

    fn slot(&self, image: HostImage) -> Result<&Slot, HostError> {
        self.images.get(image.0).ok_or(HostError::UnknownImage(image))
    }

    fn slot_mut(&mut self, image: HostImage) -> Result<&mut Slot, HostError> {
        self.images
            .get_mut(image.0)
            .ok_or(HostError::UnknownImage(image))
    }
}

impl ImagingRuntime for HostRuntime {
    type Image = HostImage;
    type Error = HostError;

    fn import_host(
        &mut self,
        buffer: PixelBuffer,
        addressing: AddressingDescriptor,
    ) -> Result<HostImage, HostError> {
        let (width, height) = (buffer.width(), buffer.height());
        debug!("adopting {width}x{height} host buffer");
        Ok(self.insert(Slot {
            width,
            height,
            addressing,
            data: buffer.into_samples(),
        }))
    }

    fn map(&self, image: &HostImage) -> Result<MappedImage<'_>, HostError> {
        let slot = self.slot(*image)?;
        Ok(MappedImage {
            width: slot.width,
            height: slot.height,
            addressing: slot.addressing,
            data: &slot.data,
        })
    }
}

fn scale_coordinate(coord: u32, from: u32, to: u32) -> u32 {
    (u64::from(coord) * u64::from(to) / u64::from(from)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_rows_are_padded() {
        let mut runtime = HostRuntime::new();
        let image = runtime.create_image(10, 3).unwrap();
        let mapped = runtime.map(&image).unwrap();
        assert_eq!(mapped.addressing.stride_y, ROW_ALIGN as i32);
        assert_eq!(mapped.data.len(), 3 * ROW_ALIGN as usize);
    }

    #[test]
    fn empty_images_are_refused() {
        let mut runtime = HostRuntime::new();
        assert!(matches!(
            runtime.create_image(0, 3),
            Err(HostError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn unknown_handles() {
        let runtime = HostRuntime::new();
        assert!(matches!(
            runtime.map(&HostImage(3)),
            Err(HostError::UnknownImage(HostImage(3)))
        ));
    }

    #[test]
    fn short_target_memory_is_an_error() {
        let mut runtime = HostRuntime::new();
        let input = PixelBuffer::from_samples(1, 1, vec![5]).unwrap();
        let input = runtime.import(input).unwrap();

        // Claims a 64 byte pitch over two rows but holds only one.
        let output = runtime.insert(Slot {
            width: 2,
            height: 2,
            addressing: AddressingDescriptor {
                stride_y: ROW_ALIGN as i32,
                ..AddressingDescriptor::unit(2).unwrap()
            },
            data: vec![0; ROW_ALIGN as usize],
        });

        assert!(matches!(
            runtime.process(&[input], &[output]),
            Err(HostError::Pgm(pgm::Error::Addressing(_)))
        ));
        let mapped = runtime.map(&output).unwrap();
        assert!(mapped.data.iter().all(|&sample| sample == 0));
    }

    #[test]
    fn nearest_neighbour() {
        assert_eq!(scale_coordinate(0, 4, 2), 0);
        assert_eq!(scale_coordinate(1, 4, 2), 0);
        assert_eq!(scale_coordinate(3, 4, 2), 1);
        assert_eq!(scale_coordinate(1, 2, 4), 2);
    }
}
