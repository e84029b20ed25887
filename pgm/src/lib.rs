// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! # PGM
//!
//! Reading and writing of 8-bit Portable GrayMap images, with strided access to pixel memory.
//!
//! Decoding produces a [`PixelBuffer`], a tightly packed matrix of samples. Encoding on the other
//! hand reads from a [`PatchRef`]: any byte slice viewed through an [`AddressingDescriptor`] with
//! independent stride, scale and step per axis. This allows writing images that live in memory
//! owned by some other imaging runtime, with padded rows or sub-sampled axes, without first
//! copying them into a packed buffer. In the other direction a decoded buffer can be overlaid with
//! its unit addressing and handed to such a runtime by value, see [`ImagingRuntime`].
//!
//! Both the ASCII (`P2`) and the binary (`P5`) variants of the format are read, samples with a
//! maximum value above 255 are rejected.
//!
//! ## Usage
//!
//! ```
//! use image_pgm::{decode, encode, AddressingDescriptor, SCALE_UNITY};
//!
//! let file = b"P5\n2 2 255\n\x0a\x14\x1e\x28";
//! let image = decode(&file[..])?;
//! assert_eq!((image.width(), image.height()), (2, 2));
//! assert_eq!(image.as_slice(), &[10, 20, 30, 40]);
//!
//! // Rows padded to 4 bytes, as some runtime might store them.
//! let padded = [10u8, 20, 0, 0, 30, 40, 0, 0];
//! let addressing = AddressingDescriptor {
//!     stride_x: 1,
//!     stride_y: 4,
//!     scale_x: SCALE_UNITY,
//!     scale_y: SCALE_UNITY,
//!     step_x: 1,
//!     step_y: 1,
//! };
//!
//! let mut output = Vec::new();
//! encode(&mut output, 2, 2, addressing, &padded)?;
//! assert_eq!(output, file);
//! # Ok::<_, image_pgm::Error>(())
//! ```
// Nothing in here requires it, keep it that way.
#![deny(unsafe_code)]

mod buffer;
mod decode;
mod encode;
mod error;
pub mod layout;
mod limits;
mod runtime;

pub use self::buffer::PixelBuffer;
pub use self::decode::{decode, read_file, Decoder, Encoding, Header};
pub use self::encode::{encode, write_file, Encoder};
pub use self::error::{Error, FormatError, Section};
pub use self::layout::{AddressingDescriptor, PatchLayout, PatchMut, PatchRef, SCALE_UNITY};
pub use self::limits::Limits;
pub use self::runtime::{write_image, ImagingRuntime, MappedImage};
