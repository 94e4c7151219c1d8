use crate::config::DEFAULT_CONFIG_PATH;
use eyre::{bail, Result};
use pico_args::Arguments;
use std::{
  ffi::{OsStr, OsString},
  path::PathBuf,
};

/// Help message for the splicer. Loosely modeled on [docopt](http://docopt.org/).
pub const HELP:&str = "\
USAGE:
  image-splicer [OPTIONS]

FLAGS:
  -h, --help                   Prints help information.
  -V, --version                Prints version information.
  -v                           More logging. Repeat for debug and trace output.
  --check                      Runs every stage but writes nothing.

OPTIONS:
  --config PATH                Project file. Defaults to ./splice.toml.
  --image PATH                 Overrides [image].path.
  --output PATH                Overrides [project].output.
  --define NAME                Adds a define. May be repeated.
  --emit-trampolines PATH      Writes the generated stub assembly.
  --emit-symbols PATH          Writes the resolved symbol listing.
";

/// Arguments to a run of the splicer.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct AppArgs {
  pub config:PathBuf,
  pub image:Option<PathBuf,>,
  pub output:Option<PathBuf,>,
  /// Added to the project's defines.
  pub defines:Vec<String,>,
  pub check:bool,
  pub emit_trampolines:Option<PathBuf,>,
  pub emit_symbols:Option<PathBuf,>,
  /// Number of `-v` flags.
  pub verbosity:u8,
}

impl AppArgs {
  /// Log level for the given number of `-v` flags.
  pub fn level_filter(&self,) -> log::LevelFilter {
    match self.verbosity {
      0 => log::LevelFilter::Warn,
      1 => log::LevelFilter::Info,
      2 => log::LevelFilter::Debug,
      _ => log::LevelFilter::Trace,
    }
  }
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Invocation {
  Help,
  Version,
  Run(AppArgs,),
}

/// Build an [`Invocation`] from the arguments the user passed via the CLI.
pub fn parse_arguments() -> Result<Invocation,> {
  parse_from(Arguments::from_env(),)
}

/// Like [`parse_arguments`] for an explicit argument list without the program
/// name.
pub fn parse_args_from<I:IntoIterator<Item = S,>, S:Into<OsString,>,>(args:I,) -> Result<Invocation,> {
  parse_from(Arguments::from_vec(args.into_iter().map(Into::into,).collect(),),)
}

fn parse_from(mut pargs:Arguments,) -> Result<Invocation,> {
  // Help has a higher priority and should be handled separately.
  if pargs.contains(["-h", "--help",],) {
    return Ok(Invocation::Help,);
  }
  if pargs.contains(["-V", "--version",],) {
    return Ok(Invocation::Version,);
  }

  let mut verbosity = 0u8;
  while pargs.contains("-v",) {
    verbosity = verbosity.saturating_add(1,);
  }

  let args = AppArgs {
    config:pargs
      .opt_value_from_os_str("--config", parse_path,)?
      .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH,),),
    image:pargs.opt_value_from_os_str("--image", parse_path,)?,
    output:pargs.opt_value_from_os_str("--output", parse_path,)?,
    defines:pargs.values_from_str("--define",)?,
    check:pargs.contains("--check",),
    emit_trampolines:pargs.opt_value_from_os_str("--emit-trampolines", parse_path,)?,
    emit_symbols:pargs.opt_value_from_os_str("--emit-symbols", parse_path,)?,
    verbosity,
  };

  let remaining = pargs.finish();
  if !remaining.is_empty() {
    bail!("unexpected arguments: {:?}", remaining);
  }
  Ok(Invocation::Run(args,),)
}

fn parse_path(s:&OsStr,) -> Result<PathBuf,> {
  Ok(s.into(),)
}
