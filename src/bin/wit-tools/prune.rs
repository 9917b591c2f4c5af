use anyhow::{bail, Context, Result};
use std::io::Write;
use wit_resolve::Node;

/// Remove everything unrelated to a single world or interface.
///
/// The result is written back out in the same JSON form as the input.
#[derive(clap::Parser)]
pub struct Opts {
    #[clap(flatten)]
    io: wit_tools::InputOutput,

    /// The world to keep, either by name or by its fully qualified
    /// `ns:pkg/name` identifier.
    #[clap(long, short, value_name = "WORLD", conflicts_with = "interface")]
    world: Option<String>,

    /// The interface to keep, either by name or by its fully qualified
    /// `ns:pkg/name` identifier.
    #[clap(long, short, value_name = "INTERFACE")]
    interface: Option<String>,
}

impl Opts {
    pub fn general_opts(&self) -> &wit_tools::GeneralOpts {
        self.io.general_opts()
    }

    pub fn run(&self) -> Result<()> {
        let resolve = self.io.parse_input()?;
        let target = match (&self.world, &self.interface) {
            (Some(pattern), _) => match resolve.match_world(pattern) {
                Some(id) => Node::World(id),
                None => bail!("no world matching `{pattern}`"),
            },
            (None, Some(pattern)) => match resolve.match_interface(pattern) {
                Some(id) => Node::Interface(id),
                None => bail!("no interface matching `{pattern}`"),
            },
            (None, None) => bail!("one of `--world` or `--interface` must be specified"),
        };

        let pruned = resolve.prune_to(target);
        log::info!(
            "pruned {} types down to {}",
            resolve.types.len(),
            pruned.types.len()
        );
        let json = pruned.to_json().context("failed to encode pruned packages")?;
        let mut output = self.io.output_writer()?;
        writeln!(output, "{json}")?;
        output.flush()?;
        Ok(())
    }
}
