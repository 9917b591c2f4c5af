use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;

/// Version string including the commit this was built from, when known.
const VERSION: &str = match option_env!("CARGO_VERSION_INFO") {
    Some(info) => info,
    None => env!("CARGO_PKG_VERSION"),
};

macro_rules! subcommands {
    ($(
        $(#[$attr:meta])*
        ($name:ident, $string:tt)
    )*) => {
        $(
            #[cfg(feature = $string)]
            mod $name;
        )*

        #[derive(Parser)]
        #[clap(version = VERSION)]
        #[allow(non_camel_case_types)]
        enum WitTools {
            $(
                #[cfg(feature = $string)]
                $(#[$attr])*
                $name($name::Opts),
            )*
        }

        impl WitTools {
            fn run(self) -> Result<()> {
                match self {
                    $(
                        #[cfg(feature = $string)]
                        Self::$name(opts) => opts.run(),
                    )*
                }
            }

            fn general_opts(&self) -> &wit_tools::GeneralOpts {
                match *self {
                    $(
                        #[cfg(feature = $string)]
                        Self::$name(ref opts) => opts.general_opts(),
                    )*
                }
            }
        }
    }
}

subcommands! {
    (list, "list")
    (abi, "abi")
    (prune, "prune")
}

fn main() -> ExitCode {
    let args = <WitTools as Parser>::parse();
    args.general_opts().init_logger();
    let err = match args.run() {
        Ok(()) => return ExitCode::SUCCESS,
        Err(e) => e,
    };
    // If an error happened and it's connected to something like `EPIPE` then
    // don't print out an error and instead just silently exit with a failure.
    // This prevents stray panic messages when the stdout pipe is closed, for
    // example.
    if let Some(io) = err.downcast_ref::<io::Error>() {
        if io.kind() == io::ErrorKind::BrokenPipe {
            return ExitCode::FAILURE;
        }
    }
    eprintln!("Error: {err:?}");
    ExitCode::FAILURE
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    WitTools::command().debug_assert()
}
