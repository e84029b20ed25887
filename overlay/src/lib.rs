//! Driver for handing PGM images to an imaging runtime and writing its outputs back.
//!
//! The program reads `n` input images, overlays each of them with its unit addressing and gives
//! them to a [`runtime::HostRuntime`]. The runtime produces `m` outputs at the reference
//! dimensions, in its own memory layout, which are then written through their mapped addressing.
pub mod args;
pub mod runtime;

use std::fs::File;
use std::io::BufWriter;

use log::info;

use pgm::{write_image, Decoder, ImagingRuntime};

use args::Plan;
use runtime::{HostError, HostRuntime};

/// Decode all inputs, run the runtime's graph and write every output.
pub fn run(plan: &Plan) -> Result<(), HostError> {
    let mut runtime = HostRuntime::new();

    let mut inputs = Vec::with_capacity(plan.inputs.len());
    for (i, path) in plan.inputs.iter().enumerate() {
        info!("reading input image #{i} from file: {}", path.display());
        let buffer = Decoder::open(path)
            .and_then(|decoder| decoder.with_limits(plan.limits).decode())
            .map_err(|source| HostError::Input {
                path: path.clone(),
                source,
            })?;
        inputs.push(runtime.import(buffer)?);
    }

    info!("reference dimensions: w={} h={}", plan.width, plan.height);
    let outputs = plan
        .outputs
        .iter()
        .map(|_| runtime.create_image(plan.width, plan.height))
        .collect::<Result<Vec<_>, _>>()?;

    runtime.process(&inputs, &outputs)?;

    for (i, (image, path)) in outputs.iter().zip(&plan.outputs).enumerate() {
        info!("writing output image #{i} to file: {}", path.display());
        let file = File::create(path).map_err(|source| HostError::File {
            path: path.clone(),
            source,
        })?;
        write_image(&runtime, image, BufWriter::new(file))?;
    }

    Ok(())
}
