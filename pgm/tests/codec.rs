use image_pgm::{decode, Decoder, Encoder, Encoding, Error, FormatError, PixelBuffer, Section};

fn binary_file(width: u32, height: u32, body: &[u8]) -> Vec<u8> {
    let mut file = format!("P5\n{width} {height} 255\n").into_bytes();
    file.extend_from_slice(body);
    file
}

fn gradient(width: u32, height: u32) -> PixelBuffer {
    let samples = (0..width * height).map(|i| (i * 7 % 256) as u8).collect();
    PixelBuffer::from_samples(width, height, samples).unwrap()
}

#[test]
fn scenario() {
    let file = binary_file(2, 2, &[10, 20, 30, 40]);
    let image = decode(&file[..]).unwrap();

    assert_eq!(image.width(), 2);
    assert_eq!(image.height(), 2);
    assert_eq!(image.as_slice(), &[10, 20, 30, 40]);

    let encoded = Encoder::new(Vec::new()).encode(&image.overlay()).unwrap();
    assert_eq!(encoded, file);
}

#[test]
fn binary_round_trip() {
    let image = gradient(37, 11);
    let encoded = Encoder::new(Vec::new()).encode(&image.overlay()).unwrap();
    let decoded = decode(&encoded[..]).unwrap();
    assert_eq!(decoded, image);
    assert_eq!(decoded.as_slice().len(), 37 * 11);
}

#[test]
fn ascii_source_re_encoded_binary() {
    let file = b"P2\n3 2\n255\n0 1 2\n253 254 255\n";
    let image = decode(&file[..]).unwrap();
    assert_eq!(image.as_slice(), &[0, 1, 2, 253, 254, 255]);

    let encoded = Encoder::new(Vec::new()).encode(&image.overlay()).unwrap();
    assert_eq!(decode(&encoded[..]).unwrap(), image);
}

#[test]
fn ascii_output_round_trip() {
    let image = gradient(40, 3);
    let encoded = Encoder::new(Vec::new())
        .with_encoding(Encoding::Ascii)
        .encode(&image.overlay())
        .unwrap();
    assert!(encoded.starts_with(b"P2\n40 3 255\n"));
    assert_eq!(decode(&encoded[..]).unwrap(), image);
}

#[test]
fn comments_are_ignored() {
    let plain = b"P5\n3 1\n255\n\x01\x02\x03";
    let commented = b"P5\n# created by hand\n\n#another one\n  \t3 1\n255\n\x01\x02\x03";
    let between = b"P5 # magic\n3 # width\n1 # height\n255\n\x01\x02\x03";

    let expected = decode(&plain[..]).unwrap();
    assert_eq!(decode(&commented[..]).unwrap(), expected);
    assert_eq!(decode(&between[..]).unwrap(), expected);
}

#[test]
fn comment_sign_in_binary_data() {
    // Once the separator is read, a `#` is just a sample.
    let file = b"P5\n2 1 255\n#\n";
    let image = decode(&file[..]).unwrap();
    assert_eq!(image.as_slice(), b"#\n");
}

#[test]
fn depth_rejection() {
    for maxval in [256u64, 1000, 65535, 1 << 40] {
        for (width, height) in [(1, 1), (2, 3), (640, 480)] {
            let file = format!("P5\n{width} {height}\n{maxval}\n");
            let err = decode(file.as_bytes()).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedSampleDepth(depth) if depth == maxval),
                "{err:?}"
            );
        }
    }
}

#[test]
fn lower_maxval_keeps_samples() {
    let file = b"P2\n2 1\n15\n3 15\n";
    let image = decode(&file[..]).unwrap();
    assert_eq!(image.as_slice(), &[3, 15]);
}

#[test]
fn bad_magic() {
    for magic in [&b"P6"[..], b"P1", b"p5", b"XX", b"5P"] {
        let mut file = magic.to_vec();
        file.extend_from_slice(b"\n1 1 255\n\x00");
        let err = decode(&file[..]).unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::BadMagic(m)) if m == magic),
            "{err:?}"
        );
    }
}

#[test]
fn bad_dimensions() {
    for header in [
        &b"P5\n0 1 255\n"[..],
        b"P5\n1 0 255\n",
        b"P5\n2147483648 1 255\n",
        b"P5\n1 99999999999999999999999 255\n",
    ] {
        let err = decode(header).unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::BadDimensions { .. })),
            "{err:?}"
        );
    }
}

#[test]
fn truncated_header() {
    let cases: [(&[u8], Section); 5] = [
        (b"", Section::Magic),
        (b"P", Section::Magic),
        (b"P5", Section::Header),
        (b"P5\n# only a comment", Section::Header),
        (b"P5\n4 4", Section::Header),
    ];

    for (file, section) in cases {
        let err = decode(file).unwrap_err();
        assert!(
            matches!(err, Error::Truncated(s) if s == section),
            "{file:?}: {err:?}"
        );
    }
}

#[test]
fn truncated_binary_body() {
    let file = binary_file(4, 4, &[0; 15]);
    let err = decode(&file[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));

    let file = binary_file(4, 4, &[]);
    let err = decode(&file[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));
}

#[test]
fn truncated_ascii_body() {
    let short = b"P2\n2 2\n255\n1 2 3";
    let err = decode(&short[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));

    let garbage = b"P2\n2 2\n255\n1 2 x 4";
    let err = decode(&garbage[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));
}

#[test]
fn ascii_sample_out_of_range() {
    let file = b"P2\n2 1\n255\n1 256\n";
    let err = decode(&file[..]).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::SampleOutOfRange(256))
    ));
}

#[test]
fn trailing_data_is_left_unread() {
    let mut file = binary_file(1, 1, &[42]);
    file.extend_from_slice(b"P5\n1 1 255\n\x07");

    let mut reader = &file[..];
    let first = Decoder::new(&mut reader).decode().unwrap();
    let second = Decoder::new(&mut reader).decode().unwrap();
    assert_eq!(first.as_slice(), &[42]);
    assert_eq!(second.as_slice(), &[7]);
}

#[test]
fn files_round_trip() {
    let dir = std::env::temp_dir().join(format!("image-pgm-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("gradient.pgm");

    let image = gradient(16, 9);
    image_pgm::write_file(&path, &image.overlay()).unwrap();
    let read = image_pgm::read_file(&path).unwrap();
    assert_eq!(read, image);

    std::fs::remove_dir_all(&dir).unwrap();
    assert!(matches!(
        image_pgm::read_file(&path),
        Err(Error::Io(_))
    ));
}
