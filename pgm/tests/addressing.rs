use image_pgm::{
    decode, encode, write_image, AddressingDescriptor, Error, ImagingRuntime, MappedImage,
    PatchRef, PixelBuffer, SCALE_UNITY,
};

fn unit(stride_y: i32) -> AddressingDescriptor {
    AddressingDescriptor {
        stride_x: 1,
        stride_y,
        scale_x: SCALE_UNITY,
        scale_y: SCALE_UNITY,
        step_x: 1,
        step_y: 1,
    }
}

fn body(file: &[u8], width: u32, height: u32) -> &[u8] {
    &file[file.len() - (width * height) as usize..]
}

/// Rows of `width` samples followed by as many bytes of junk.
fn padded_rows(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for y in 0..height {
        data.extend((0..width).map(|x| (y * width + x) as u8));
        data.extend((0..width).map(|_| 0xEE));
    }
    data
}

#[test]
fn padded_rows_read_only_the_grid() {
    let (width, height) = (5u32, 4u32);
    let stride_y = width * 2;
    let data = padded_rows(width, height);

    // Everything past the last sample of the last row can be cut off.
    let needed = ((height - 1) * stride_y + width) as usize;
    assert!(needed <= (height * stride_y + width) as usize);
    let data = &data[..needed];

    let mut file = Vec::new();
    encode(&mut file, width, height, unit(stride_y as i32), data).unwrap();

    let expected: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
    assert_eq!(body(&file, width, height), &expected[..]);
    assert!(!file.contains(&0xEE));

    // One byte less and the last sample is out of bounds.
    let err = encode(
        Vec::new(),
        width,
        height,
        unit(stride_y as i32),
        &data[..needed - 1],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Addressing(_)));
}

#[test]
fn bounds_violation_writes_nothing() {
    let mut file = Vec::new();
    let err = encode(&mut file, 4, 4, unit(4), &[0; 15]).unwrap_err();
    assert!(matches!(err, Error::Addressing(_)));
    assert!(file.is_empty());

    let upwards = AddressingDescriptor {
        stride_y: -4,
        ..unit(4)
    };
    let err = encode(&mut file, 4, 4, upwards, &[0; 64]).unwrap_err();
    assert!(matches!(err, Error::Addressing(_)));
}

#[test]
fn column_major_written_row_major() {
    // A 3x2 grid, stored column after column.
    let addressing = AddressingDescriptor {
        stride_x: 2,
        stride_y: 1,
        ..unit(0)
    };
    let data = [1u8, 4, 2, 5, 3, 6];

    let mut file = Vec::new();
    encode(&mut file, 3, 2, addressing, &data).unwrap();
    assert_eq!(body(&file, 3, 2), &[1, 2, 3, 4, 5, 6]);
}

#[test]
fn horizontally_upsampled_patch() {
    // A 2x2 physical image presented as 4x2 through a half horizontal scale.
    let addressing = AddressingDescriptor {
        scale_x: SCALE_UNITY / 2,
        step_x: 2,
        ..unit(2)
    };
    let data = [1u8, 2, 3, 4];

    let patch = PatchRef::with_addressing(4, 2, addressing, &data).unwrap();
    assert_eq!(patch.layout().byte_len(), 4);
    assert!(patch.contiguous_row(0).is_none());

    let mut file = Vec::new();
    encode(&mut file, 4, 2, addressing, &data).unwrap();
    assert_eq!(body(&file, 4, 2), &[1, 1, 2, 2, 3, 3, 4, 4]);
}

/// A runtime that stores every image with rows padded to 8 bytes.
#[derive(Default)]
struct PaddingRuntime {
    images: Vec<(u32, u32, Vec<u8>)>,
}

const PITCH: u32 = 8;

impl ImagingRuntime for PaddingRuntime {
    type Image = usize;
    type Error = Error;

    fn import_host(
        &mut self,
        buffer: PixelBuffer,
        addressing: AddressingDescriptor,
    ) -> Result<usize, Error> {
        assert_eq!(addressing, buffer.addressing());
        let patch = buffer.overlay();

        let mut data = vec![0u8; (PITCH * buffer.height()) as usize];
        let mut row = Vec::new();
        for y in 0..buffer.height() {
            patch.gather_row(y, &mut row);
            let start = (y * PITCH) as usize;
            data[start..start + row.len()].copy_from_slice(&row);
        }

        self.images.push((buffer.width(), buffer.height(), data));
        Ok(self.images.len() - 1)
    }

    fn map(&self, image: &usize) -> Result<MappedImage<'_>, Error> {
        let (width, height, data) = &self.images[*image];
        Ok(MappedImage {
            width: *width,
            height: *height,
            addressing: unit(PITCH as i32),
            data,
        })
    }
}

#[test]
fn runtime_image_round_trip() {
    let file = b"P5\n3 2 255\n\x01\x02\x03\x04\x05\x06";
    let image = decode(&file[..]).unwrap();

    let mut runtime = PaddingRuntime::default();
    let handle = runtime.import(image.clone()).unwrap();

    let mut output = Vec::new();
    write_image(&runtime, &handle, &mut output).unwrap();
    assert_eq!(output, file);
    assert_eq!(decode(&output[..]).unwrap(), image);
}

#[test]
fn runtime_mapping_is_validated() {
    let mut runtime = PaddingRuntime::default();
    let image = PixelBuffer::from_samples(9, 1, vec![0; 9]).unwrap();
    // Wider than the runtime's pitch; the mapping addresses more than it stores.
    runtime.images.push((image.width(), image.height(), vec![0; 8]));

    let err = write_image(&runtime, &0, Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Addressing(_)));
}
