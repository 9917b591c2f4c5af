use anyhow::{bail, Result};
use std::io::Write;
use termcolor::WriteColor;
use wit_resolve::abi::{AbiVariant, WasmType};
use wit_resolve::{Function, InterfaceId, Resolve, SizeAlign, Type, WorldId, WorldItem};
use wit_tools::{write_keyword, write_name};

/// Print the Canonical ABI layout of types and functions.
///
/// For every named type this prints its size, alignment and flattened core
/// wasm representation. For every function it prints the core wasm
/// signature used when the function is imported and when it's exported.
#[derive(clap::Parser)]
pub struct Opts {
    #[clap(flatten)]
    io: wit_tools::InputOutput,

    /// Only print the world matching this name or identifier.
    #[clap(long, short, value_name = "WORLD", conflicts_with = "interface")]
    world: Option<String>,

    /// Only print the interface matching this name or identifier.
    #[clap(long, short, value_name = "INTERFACE")]
    interface: Option<String>,
}

impl Opts {
    pub fn general_opts(&self) -> &wit_tools::GeneralOpts {
        self.io.general_opts()
    }

    pub fn run(&self) -> Result<()> {
        let resolve = self.io.parse_input()?;
        let mut sizes = SizeAlign::default();
        sizes.fill(&resolve);
        let mut printer = Printer {
            resolve: &resolve,
            sizes: &sizes,
            output: self.io.output_writer()?,
        };

        match (&self.world, &self.interface) {
            (Some(pattern), _) => match resolve.match_world(pattern) {
                Some(id) => printer.world(id)?,
                None => bail!("no world matching `{pattern}`"),
            },
            (None, Some(pattern)) => match resolve.match_interface(pattern) {
                Some(id) => printer.interface(id)?,
                None => bail!("no interface matching `{pattern}`"),
            },
            (None, None) => {
                for (id, _) in resolve.interfaces.iter() {
                    printer.interface(id)?;
                }
                for (id, _) in resolve.worlds.iter() {
                    printer.world(id)?;
                }
            }
        }
        printer.output.flush()?;
        Ok(())
    }
}

struct Printer<'a> {
    resolve: &'a Resolve,
    sizes: &'a SizeAlign,
    output: Box<dyn WriteColor>,
}

impl Printer<'_> {
    fn interface(&mut self, id: InterfaceId) -> Result<()> {
        let iface = &self.resolve.interfaces[id];
        let name = match self.resolve.id_of(id) {
            Some(name) => name,
            None => match &iface.name {
                Some(name) => name.clone(),
                None => format!("interface-{}", id.index()),
            },
        };
        write_keyword(&mut *self.output, "interface")?;
        write!(self.output, " ")?;
        write_name(&mut *self.output, &name)?;
        writeln!(self.output)?;

        for (name, ty) in iface.types.iter() {
            let ty = Type::Id(*ty);
            write!(self.output, "  ")?;
            write_keyword(&mut *self.output, "type")?;
            writeln!(
                self.output,
                " {name}: size {}, align {}, flat [{}]",
                self.sizes.size(&ty),
                self.sizes.align(&ty),
                wasm_types(&self.resolve.flat(&ty)),
            )?;
        }

        for func in iface.functions.values() {
            write!(self.output, "  ")?;
            write_keyword(&mut *self.output, "func")?;
            let import = self.signature(AbiVariant::GuestImport, func);
            let export = self.signature(AbiVariant::GuestExport, func);
            writeln!(
                self.output,
                " {}: import {import}, export {export}",
                func.name
            )?;
        }
        Ok(())
    }

    fn world(&mut self, id: WorldId) -> Result<()> {
        let world = &self.resolve.worlds[id];
        let name = match world.package {
            Some(pkg) => self.resolve.packages[pkg]
                .name
                .with_extension(&world.name)
                .to_string(),
            None => world.name.clone(),
        };
        write_keyword(&mut *self.output, "world")?;
        write!(self.output, " ")?;
        write_name(&mut *self.output, &name)?;
        writeln!(self.output)?;

        let items = [
            ("import", AbiVariant::GuestImport, &world.imports),
            ("export", AbiVariant::GuestExport, &world.exports),
        ];
        for (kind, variant, items) in items {
            for (key, item) in items.iter() {
                let WorldItem::Function(func) = item else {
                    continue;
                };
                write!(self.output, "  ")?;
                write_keyword(&mut *self.output, kind)?;
                writeln!(
                    self.output,
                    " {}: {}",
                    self.resolve.name_world_key(key),
                    self.signature(variant, func)
                )?;
            }
        }
        Ok(())
    }

    fn signature(&self, variant: AbiVariant, func: &Function) -> String {
        let sig = self.resolve.wasm_signature(variant, func);
        format!(
            "({}) -> ({})",
            wasm_types(&sig.params),
            wasm_types(&sig.results)
        )
    }
}

fn wasm_types(types: &[WasmType]) -> String {
    types
        .iter()
        .map(|ty| match ty {
            WasmType::I32 => "i32",
            WasmType::I64 => "i64",
            WasmType::F32 => "f32",
            WasmType::F64 => "f64",
            WasmType::Pointer => "ptr",
        })
        .collect::<Vec<_>>()
        .join(", ")
}
