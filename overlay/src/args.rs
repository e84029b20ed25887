//! Command-line argument definitions and validation.

use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use thiserror::Error;

use pgm::Limits;

#[derive(Debug, Parser)]
#[command(
    name = "pgm-overlay",
    about = "Hand PGM images to an imaging runtime and write back its outputs",
    override_usage = "pgm-overlay [OPTIONS] in_0.pgm ... in_n.pgm width height [out_0.pgm ... out_m.pgm]"
)]
pub struct Args {
    /// Number of input images
    #[arg(long, default_value_t = 2)]
    pub inputs: usize,

    /// Number of output images
    #[arg(long, default_value_t = 2)]
    pub outputs: usize,

    /// Refuse to decode inputs with more samples than this
    #[arg(long)]
    pub max_pixels: Option<u64>,

    /// Input paths, the reference width and height, then optional output paths
    #[arg(required = true, value_name = "ARGS")]
    pub positional: Vec<OsString>,
}

/// What to do, after validating the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub inputs: Vec<PathBuf>,
    /// Reference dimensions of the output images.
    pub width: u32,
    pub height: u32,
    pub outputs: Vec<PathBuf>,
    pub limits: Limits,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("requires {inputs} input paths, width and height, and optionally {outputs} output paths (got {got} arguments)")]
    Count {
        inputs: usize,
        outputs: usize,
        got: usize,
    },
    #[error("no input images requested")]
    NoInputs,
    #[error("invalid reference {axis} `{value}`, expected a positive integer")]
    Dimension { axis: &'static str, value: String },
}

impl Args {
    /// Split the positional arguments.
    ///
    /// Outputs default to `<program>-output_<i>.pgm` unless all of them are named.
    pub fn plan(&self, program: &str) -> Result<Plan, UsageError> {
        if self.inputs == 0 {
            return Err(UsageError::NoInputs);
        }

        let got = self.positional.len();
        let bare = self.inputs + 2;
        if got != bare && got != bare + self.outputs {
            return Err(UsageError::Count {
                inputs: self.inputs,
                outputs: self.outputs,
                got,
            });
        }

        let (inputs, rest) = self.positional.split_at(self.inputs);
        let width = parse_dimension("width", &rest[0])?;
        let height = parse_dimension("height", &rest[1])?;

        let outputs = if got == bare {
            (0..self.outputs)
                .map(|i| PathBuf::from(format!("{program}-output_{i}.pgm")))
                .collect()
        } else {
            rest[2..].iter().map(PathBuf::from).collect()
        };

        let limits = match self.max_pixels {
            Some(max) => Limits::none().with_max_pixels(max),
            None => Limits::none(),
        };

        Ok(Plan {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            width,
            height,
            outputs,
            limits,
        })
    }
}

fn parse_dimension(axis: &'static str, value: &OsStr) -> Result<u32, UsageError> {
    value
        .to_str()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|&dim| dim > 0 && dim <= pgm::PixelBuffer::MAX_DIMENSION)
        .ok_or_else(|| UsageError::Dimension {
            axis,
            value: value.to_string_lossy().into_owned(),
        })
}
