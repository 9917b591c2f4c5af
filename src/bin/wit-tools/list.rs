use anyhow::Result;
use std::io::Write;
use termcolor::WriteColor;
use wit_resolve::{Resolve, WorldItem};
use wit_tools::{write_keyword, write_name};

/// List the packages, interfaces and worlds of a resolved set of WIT
/// packages.
///
/// Each world is followed by the names of its imports and exports.
#[derive(clap::Parser)]
pub struct Opts {
    #[clap(flatten)]
    io: wit_tools::InputOutput,
}

impl Opts {
    pub fn general_opts(&self) -> &wit_tools::GeneralOpts {
        self.io.general_opts()
    }

    pub fn run(&self) -> Result<()> {
        let resolve = self.io.parse_input()?;
        let mut output = self.io.output_writer()?;
        print_resolve(&resolve, &mut *output)?;
        output.flush()?;
        Ok(())
    }
}

fn print_resolve(resolve: &Resolve, output: &mut dyn WriteColor) -> Result<()> {
    for (_, pkg) in resolve.packages.iter() {
        write_keyword(output, "package")?;
        write!(output, " ")?;
        write_name(output, &pkg.name.to_string())?;
        writeln!(output)?;

        for name in pkg.interfaces.keys() {
            write!(output, "  ")?;
            write_keyword(output, "interface")?;
            writeln!(output, " {name}")?;
        }

        for (name, id) in pkg.worlds.iter() {
            write!(output, "  ")?;
            write_keyword(output, "world")?;
            writeln!(output, " {name}")?;
            let world = &resolve.worlds[*id];
            for (kind, items) in [("import", &world.imports), ("export", &world.exports)] {
                for (key, item) in items.iter() {
                    write!(output, "    ")?;
                    write_keyword(output, kind)?;
                    let name = resolve.name_world_key(key);
                    match item {
                        WorldItem::Type(_) => writeln!(output, " type {name}")?,
                        _ => writeln!(output, " {name}")?,
                    }
                }
            }
        }
    }
    Ok(())
}
