use crate::{
  assembler::Assembler,
  config::Config,
  errors::PatchError,
  image::{Image, RegionTable},
  image_patcher::{apply, WrittenSpan},
  injector::inject,
  patch::PatchOperation,
  patch_parser::parse_patches,
  src_file::{SourceFile, SourceLoc},
  symbol_file::parse_symbol_file,
  symbol_table::{Origin, Symbol, SymbolTable},
  trampoline::{build_stubs, StubLayout, StubPlacement},
};
use eyre::{Result, WrapErr};
use std::{
  collections::BTreeSet,
  fs,
  path::{Path, PathBuf},
};

/// Everything a build reads, loaded up front so the build itself does no I/O.
#[derive(Debug, Clone,)]
pub struct Inputs {
  /// The project file, for diagnostics that point at its entries.
  pub config_src:SourceFile,
  pub image:Image,
  /// Generated symbol tables, followed by the blob's symbols.
  pub auto_symbols:Vec<SourceFile,>,
  pub user_symbols:Vec<SourceFile,>,
  pub patches:Vec<SourceFile,>,
  /// The compiled blob. Empty without a slot.
  pub blob:Vec<u8,>,
}

impl Inputs {
  /// Reads every file `config` names. `image` replaces `[image].path`.
  pub fn load(config:&Config, config_src:SourceFile, image:Option<&Path,>,) -> Result<Self,> {
    let regions = config.region_table(&config_src,)?;
    let image_path = image.map(Path::to_path_buf,).unwrap_or_else(|| config.resolve(&config.image.path,),);
    let image = Image::from_file(&image_path, regions,)?;

    let read_all = |paths:&[PathBuf]| {
      paths
        .iter()
        .map(|path| SourceFile::new_from_path(config.resolve(path,),),)
        .collect::<Result<Vec<_,>,>>()
    };
    let mut auto_symbols = read_all(&config.symbols.auto,)?;
    let user_symbols = read_all(&config.symbols.user,)?;

    let mut blob = Vec::new();
    if let Some(slot,) = &config.slot {
      let path = config.resolve(&slot.blob,);
      blob = fs::read(&path,).wrap_err_with(|| format!("failed to read blob {}", path.display()),)?;
      log::info!("Loaded {} byte blob from {}", blob.len(), path.display());
      if let Some(symbols,) = &slot.symbols {
        auto_symbols.push(SourceFile::new_from_path(config.resolve(symbols,),)?,);
      }
    }

    let mut patch_paths = config.patches.files.iter().map(|path| config.resolve(path,),).collect::<Vec<_,>>();
    for dir in &config.patches.directories {
      patch_paths.extend(patch_files_in(&config.resolve(dir,),)?,);
    }
    let patches = patch_paths
      .iter()
      .map(SourceFile::new_from_path,)
      .collect::<Result<Vec<_,>,>>()?;

    Ok(Inputs {
      config_src,
      image,
      auto_symbols,
      user_symbols,
      patches,
      blob,
    },)
  }
}

/// The `*.patch` files of `dir`, sorted by file name.
fn patch_files_in(dir:&Path,) -> Result<Vec<PathBuf,>,> {
  let mut paths = Vec::new();
  let entries = fs::read_dir(dir,).wrap_err_with(|| format!("failed to read patch directory {}", dir.display()),)?;
  for entry in entries {
    let path = entry.wrap_err_with(|| format!("failed to read patch directory {}", dir.display()),)?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == "patch",) {
      paths.push(path,);
    }
  }
  paths.sort_by(|a, b| a.file_name().cmp(&b.file_name(),),);
  log::debug!("Found {} patch files in {}", paths.len(), dir.display());
  Ok(paths,)
}

/// Result of a successful build.
#[derive(Debug, Clone,)]
pub struct BuildOutput {
  pub image:Image,
  /// Resolved symbols including the generated stubs.
  pub symbols:SymbolTable,
  pub stubs:StubLayout,
  /// Every operation applied, hook installs last.
  pub operations:Vec<PatchOperation,>,
  pub written:Vec<WrittenSpan,>,
}

/// Runs every stage on loaded inputs. Nothing is written unless every stage
/// succeeds, so an error leaves no partial output behind.
pub fn build(
  config:&Config,
  inputs:Inputs,
  defines:&BTreeSet<String,>,
  assembler:&dyn Assembler,
) -> Result<BuildOutput, PatchError,> {
  let Inputs {
    config_src,
    image,
    auto_symbols,
    user_symbols,
    patches,
    blob,
  } = inputs;

  let mut symbols = {
    let regions = image.regions();
    let auto = read_symbols(&auto_symbols, Origin::Auto, regions,)?;
    let user = read_symbols(&user_symbols, Origin::User, regions,)?;
    SymbolTable::resolve(auto, user, regions,)?
  };
  log::info!("Resolved {} symbols", symbols.len());

  let slot = config.slot.as_ref().map(|slot| slot.slot(),);
  let slot_loc = section_loc(&config_src, "[slot]",);
  let stubs = match &slot {
    Some(slot,) => build_stubs(
      &config.hooks,
      &image,
      &mut symbols,
      StubPlacement {
        region:&slot.region,
        base:slot.address.wrapping_add(blob.len() as u32,),
      },
      defines,
      assembler,
      &config_src,
    )?,
    None if config.hooks.is_empty() => StubLayout::default(),
    None => {
      return Err(PatchError::malformed(
        "hooks are configured but there is no [slot] to place their stubs in",
        section_loc(&config_src, "[[hook]]",),
      ),);
    }
  };

  let mut operations = Vec::new();
  for src in &patches {
    let parsed = parse_patches(src, &symbols, image.regions(), defines, assembler,)?;
    log::info!("Parsed {} patch operations from {}", parsed.len(), file_name(src,));
    operations.extend(parsed,);
  }
  operations.extend(stubs.install.iter().cloned(),);

  let mut patched = apply(image, &operations,)?;

  if let Some(slot,) = &slot {
    let mut payload = blob;
    if !stubs.stubs.is_empty() {
      // Stubs start at the first word boundary after the blob
      let stub_offset = stubs.stubs[0].address.wrapping_sub(slot.address,) as usize;
      payload.resize(stub_offset, 0,);
      payload.extend_from_slice(&stubs.bytes,);
    }
    patched = inject(patched, &payload, slot, &symbols, &slot_loc,)?;
  }

  let written = patched.written().to_vec();
  Ok(BuildOutput {
    image:patched.into_image(),
    symbols,
    stubs,
    operations,
    written,
  },)
}

fn read_symbols(
  files:&[SourceFile],
  origin:Origin,
  regions:&RegionTable,
) -> Result<Vec<Symbol,>, PatchError,> {
  let mut symbols = Vec::new();
  for src in files {
    symbols.extend(parse_symbol_file(src, origin, regions,)?,);
  }
  Ok(symbols,)
}

/// Points at a section header of the project file.
fn section_loc(config_src:&SourceFile, header:&str,) -> SourceLoc {
  config_src
    .find(header,)
    .map(|span| config_src.loc(span,),)
    .unwrap_or_else(|| config_src.file_loc(),)
}

fn file_name(src:&SourceFile,) -> String {
  match src.path() {
    Some(path,) => path.display().to_string(),
    None => "<input>".to_string(),
  }
}

/// Writes the patched image and its region manifest.
pub fn write_output(output:&Path, image:&Image,) -> Result<(),> {
  if let Some(parent,) = output.parent().filter(|parent| !parent.as_os_str().is_empty(),) {
    fs::create_dir_all(parent,).wrap_err_with(|| format!("failed to create {}", parent.display()),)?;
  }
  fs::write(output, image.bytes(),).wrap_err_with(|| format!("failed to write {}", output.display()),)?;

  let manifest_path = manifest_path(output,);
  fs::write(&manifest_path, image.regions().manifest()?,)
    .wrap_err_with(|| format!("failed to write {}", manifest_path.display()),)?;
  log::info!("Wrote {} ({} bytes) and {}", output.display(), image.len(), manifest_path.display());
  Ok((),)
}

/// `<output>.regions.toml`
pub fn manifest_path(output:&Path,) -> PathBuf {
  let mut name = output.as_os_str().to_os_string();
  name.push(".regions.toml",);
  PathBuf::from(name,)
}
