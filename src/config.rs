use crate::{
  errors::PatchError,
  image::{ImageRegion, RegionTable},
  injector::InjectionSlot,
  src_file::SourceFile,
  trampoline::HookContract,
};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default project file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH:&str = "./splice.toml";

#[derive(Debug, Clone, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct Project {
  pub name:String,
  /// Where the patched image is written.
  pub output:PathBuf,
  #[serde(default)]
  pub defines:Vec<String,>,
}

#[derive(Debug, Clone, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
  pub path:PathBuf,
  #[serde(rename = "region", default)]
  pub regions:Vec<ImageRegion,>,
}

#[derive(Debug, Clone, Default, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct SymbolsConfig {
  /// Generated tables.
  #[serde(default)]
  pub auto:Vec<PathBuf,>,
  /// Hand written tables. Their definitions override generated ones.
  #[serde(default)]
  pub user:Vec<PathBuf,>,
}

#[derive(Debug, Clone, Default, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct PatchesConfig {
  #[serde(default)]
  pub files:Vec<PathBuf,>,
  /// Every `*.patch` file of these directories, in file name order.
  #[serde(default)]
  pub directories:Vec<PathBuf,>,
}

#[derive(Debug, Clone, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct SlotConfig {
  pub region:String,
  pub address:u32,
  pub budget:u32,
  /// The compiled, linked code.
  pub blob:PathBuf,
  /// Symbols of the blob. They join the generated tables.
  #[serde(default)]
  pub symbols:Option<PathBuf,>,
}

impl SlotConfig {
  pub fn slot(&self,) -> InjectionSlot {
    InjectionSlot {
      region:self.region.clone(),
      address:self.address,
      budget:self.budget,
    }
  }
}

/// Represents a `splice.toml` file.
#[derive(Debug, Clone, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct Config {
  pub project:Project,
  pub image:ImageConfig,
  #[serde(default)]
  pub symbols:SymbolsConfig,
  #[serde(default)]
  pub patches:PatchesConfig,
  #[serde(default)]
  pub slot:Option<SlotConfig,>,
  #[serde(rename = "hook", default)]
  pub hooks:Vec<HookContract,>,
  /// Directory relative paths are resolved against.
  #[serde(skip)]
  pub root:PathBuf,
}

impl Config {
  /// Parses a project file. `root` is the directory relative paths refer to.
  pub fn parse<P:Into<PathBuf,>,>(src:&str, root:P,) -> Result<Self,> {
    let mut config = toml::from_str::<Config,>(src,).wrap_err("invalid project file",)?;
    config.root = root.into();
    Ok(config,)
  }

  /// Reads the project file at `path`. The source is returned as well so
  /// diagnostics can point into it.
  pub fn load<P:AsRef<Path,>,>(path:P,) -> Result<(Config, SourceFile,),> {
    let path = path.as_ref();
    let src = SourceFile::new_from_path(path,)?;
    let root = path.parent().map(Path::to_path_buf,).unwrap_or_default();
    let config = Config::parse(src.source_str(), root,)
      .wrap_err_with(|| format!("failed to load {}", path.display()),)?;
    log::info!("Loaded project '{}' from {}", config.project.name, path.display());
    Ok((config, src,),)
  }

  /// Resolves `path` against the project file's directory.
  pub fn resolve<P:AsRef<Path,>,>(&self, path:P,) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
      path.to_path_buf()
    }
    else {
      self.root.join(path,)
    }
  }

  /// The configured regions, checked for duplicate names and addresses past
  /// 4 GiB.
  pub fn region_table(&self, src:&SourceFile,) -> Result<RegionTable, PatchError,> {
    RegionTable::new(self.image.regions.clone(), &src.file_loc(),)
  }
}
