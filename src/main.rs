use eyre::{Result, WrapErr};
use image_splicer::{
  assembler::ArmAssembler,
  cli_integration::{self, AppArgs, Invocation, HELP},
  config::Config,
  errors::{ErrorPrinter, PatchError},
  pipeline::{self, Inputs},
  src_file::SourceFile,
};
use std::{collections::BTreeSet, fs, io, process::ExitCode};

fn main() -> ExitCode {
  let args = match cli_integration::parse_arguments() {
    Ok(Invocation::Run(args,),) => args,
    Ok(Invocation::Help,) => {
      print!("{HELP}");
      return ExitCode::SUCCESS;
    }
    Ok(Invocation::Version,) => {
      println!("image-splicer {}", env!("CARGO_PKG_VERSION"));
      return ExitCode::SUCCESS;
    }
    Err(err,) => {
      println!("{HELP}");
      let _ = ErrorPrinter::print_report(io::stderr(), &err,);
      return ExitCode::FAILURE;
    }
  };

  env_logger::Builder::new()
    .filter_level(args.level_filter(),)
    .parse_default_env()
    .format_timestamp_secs()
    .init();

  match run(&args,) {
    Ok((),) => ExitCode::SUCCESS,
    Err(err,) => {
      report(&err,);
      ExitCode::FAILURE
    }
  }
}

fn run(args:&AppArgs,) -> Result<(),> {
  let (config, config_src,) = Config::load(&args.config,)?;

  let mut defines = config.project.defines.iter().cloned().collect::<BTreeSet<_,>>();
  defines.extend(args.defines.iter().cloned(),);
  log::debug!("Defines: {:?}", defines);

  let inputs = Inputs::load(&config, config_src, args.image.as_deref(),)?;
  let output = pipeline::build(&config, inputs, &defines, &ArmAssembler,)?;

  if let Some(path,) = &args.emit_trampolines {
    fs::write(path, output.stubs.source(),).wrap_err_with(|| format!("failed to write {}", path.display()),)?;
    log::info!("Wrote trampolines to {}", path.display());
  }
  if let Some(path,) = &args.emit_symbols {
    fs::write(path, output.symbols.listing(),).wrap_err_with(|| format!("failed to write {}", path.display()),)?;
    log::info!("Wrote symbols to {}", path.display());
  }

  if args.check {
    log::info!("Check passed, nothing written");
    return Ok((),);
  }
  let path = args.output.clone().unwrap_or_else(|| config.resolve(&config.project.output,),);
  pipeline::write_output(&path, &output.image,)
}

/// Prints build errors with the offending source line, anything else with its
/// cause chain.
fn report(err:&eyre::Report,) {
  let printed = match err.downcast_ref::<PatchError>() {
    Some(err,) => {
      let src = err.loc().path.as_ref().and_then(|path| SourceFile::new_from_path(path,).ok(),);
      ErrorPrinter::print(io::stderr(), src.as_ref(), err,)
    }
    None => ErrorPrinter::print_report(io::stderr(), err,),
  };
  if let Err(io_err,) = printed {
    eprintln!("{err}: {io_err}");
  }
}
