//! Benchmarks encoding and decoding of differently addressed patches.
use brunch::Bench;

use image_pgm::{AddressingDescriptor, Encoder, Encoding, PatchRef, SCALE_UNITY};

struct Codec {
    encoding: Encoding,
    /// Distance between rows, in multiples of the width.
    pitch: u32,
    /// Distance between samples of a row.
    stride_x: i32,
    sz: u32,
}

impl Codec {
    fn name(&self) -> String {
        format!(
            "codec({:?}, pitch={}, stride_x={}, {})",
            self.encoding, self.pitch, self.stride_x, self.sz
        )
    }

    fn prepare(self) -> impl FnMut() {
        let stride_y = self.sz * self.pitch * self.stride_x as u32;
        let data: Vec<u8> = (0..stride_y * self.sz).map(|i| i as u8).collect();
        let addressing = AddressingDescriptor {
            stride_x: self.stride_x,
            stride_y: stride_y as i32,
            scale_x: SCALE_UNITY,
            scale_y: SCALE_UNITY,
            step_x: 1,
            step_y: 1,
        };

        let encoding = self.encoding;
        let sz = self.sz;
        let mut output = Vec::with_capacity((sz * sz * 4) as usize + 32);

        move || {
            let patch = PatchRef::with_addressing(sz, sz, addressing, &data).unwrap();
            output.clear();
            Encoder::new(&mut output)
                .with_encoding(encoding)
                .encode(&patch)
                .unwrap();
            let image = image_pgm::decode(&output[..]).unwrap();
            assert_eq!(image.width(), sz);
        }
    }
}

fn main() {
    let tests = [
        // Packed rows can be written as slices.
        Codec {
            encoding: Encoding::Binary,
            pitch: 1,
            stride_x: 1,
            sz: 512,
        },
        // Padded rows, still contiguous.
        Codec {
            encoding: Encoding::Binary,
            pitch: 2,
            stride_x: 1,
            sz: 512,
        },
        // Interleaved samples must be gathered.
        Codec {
            encoding: Encoding::Binary,
            pitch: 1,
            stride_x: 4,
            sz: 512,
        },
        Codec {
            encoding: Encoding::Ascii,
            pitch: 1,
            stride_x: 1,
            sz: 512,
        },
    ];

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|codec| {
        Bench::new(format!("pgm::codec::main::{}", codec.name())).run(codec.prepare())
    }));
    benches.finish();
}
