//! Shared definitions for the `wit-tools` CLI. Nothing to see here, move along.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::PathBuf;
use termcolor::{Ansi, ColorChoice, NoColor, StandardStream, WriteColor};
use wit_resolve::Resolve;

#[derive(clap::Parser)]
pub struct GeneralOpts {
    /// Use verbose output (-v info, -vv debug, -vvv trace).
    #[clap(long = "verbose", short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration over whether terminal colors are used in output.
    ///
    /// Supports one of `auto|never|always|always-ansi`. The default is to
    /// detect what to do based on the terminal environment, for example by
    /// using `isatty`.
    #[clap(long = "color", default_value = "auto")]
    pub color: ColorChoice,
}

impl GeneralOpts {
    /// Initializes the logger based on the verbosity level.
    pub fn init_logger(&self) {
        // If `-v` isn't passed then see if `RUST_LOG` is configured, and if so
        // use that, otherwise fall back to the "warn" level.
        if self.verbose == 0 && std::env::var("RUST_LOG").is_ok() {
            env_logger::init();
            return;
        }
        let default = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
            .format_target(false)
            .init();
    }
}

/// Common input/output arguments shared by subcommands.
#[derive(clap::Parser)]
pub struct InputOutput {
    #[clap(flatten)]
    input: InputArg,

    #[clap(flatten)]
    output: OutputArg,

    #[clap(flatten)]
    general: GeneralOpts,
}

impl InputOutput {
    /// Reads and decodes the JSON form of a `Resolve` from the input.
    pub fn parse_input(&self) -> Result<Resolve> {
        self.input.parse_resolve()
    }

    pub fn output_writer(&self) -> Result<Box<dyn WriteColor>> {
        self.output.output_writer(self.general.color)
    }

    pub fn general_opts(&self) -> &GeneralOpts {
        &self.general
    }
}

#[derive(clap::Parser)]
pub struct InputArg {
    /// Input JSON file to process.
    ///
    /// This is the JSON form of a set of resolved WIT packages, such as the
    /// output of `wasm-tools component wit --json`. If not provided or if
    /// this is `-` then stdin is read entirely and processed.
    input: Option<PathBuf>,
}

impl InputArg {
    pub fn parse_resolve(&self) -> Result<Resolve> {
        let mut bytes = Vec::new();
        match &self.input {
            Some(path) if path.as_os_str() != "-" => {
                log::info!("reading input from {path:?}");
                File::open(path)
                    .with_context(|| format!("failed to open {path:?}"))?
                    .read_to_end(&mut bytes)
                    .with_context(|| format!("failed to read {path:?}"))?;
            }
            _ => {
                log::info!("reading input from stdin");
                io::stdin()
                    .read_to_end(&mut bytes)
                    .context("failed to read <stdin>")?;
            }
        }
        Resolve::from_json_slice(&bytes).context("failed to decode input")
    }
}

#[derive(clap::Parser)]
pub struct OutputArg {
    /// Where to place output.
    ///
    /// If not provided, then stdout is used.
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl OutputArg {
    pub fn output_writer(&self, color: ColorChoice) -> Result<Box<dyn WriteColor>> {
        match &self.output {
            Some(output) => {
                let file = File::create(output)
                    .with_context(|| format!("failed to create {output:?}"))?;
                let writer = BufWriter::new(file);
                if color == ColorChoice::AlwaysAnsi {
                    Ok(Box::new(Ansi::new(writer)))
                } else {
                    Ok(Box::new(NoColor::new(writer)))
                }
            }
            None => {
                let color = if color == ColorChoice::Auto && !io::stdout().is_terminal() {
                    ColorChoice::Never
                } else {
                    color
                };
                Ok(Box::new(StandardStream::stdout(color)))
            }
        }
    }
}

/// Writes `s` to `output`, highlighted as a keyword.
pub fn write_keyword(output: &mut dyn WriteColor, s: &str) -> io::Result<()> {
    output.set_color(termcolor::ColorSpec::new().set_fg(Some(termcolor::Color::Magenta)))?;
    write!(output, "{s}")?;
    output.reset()
}

/// Writes `s` to `output`, highlighted as a name.
pub fn write_name(output: &mut dyn WriteColor, s: &str) -> io::Result<()> {
    output.set_color(termcolor::ColorSpec::new().set_bold(true))?;
    write!(output, "{s}")?;
    output.reset()
}
