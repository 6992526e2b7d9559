//! Layered settings loading
//!
//! Settings are read once, at provider construction: an optional TOML file
//! first, then environment variables named `<PREFIX>_<SECTION>__<KEY>`
//! overriding individual keys. Every settings struct in the workspace uses
//! `#[serde(default)]`, so an absent file or section yields the defaults.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;

use crate::errors::{Error, ErrorContext, ErrorExt, Result};

/// Load settings of type `T` from an optional TOML file plus the environment
pub fn load_settings<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    let built = builder
        .add_source(environment(env_prefix))
        .build()
        .map_err(Error::from)
        .map_err(|e| e.context(source_context(path)))?;

    built
        .try_deserialize::<T>()
        .map_err(Error::from)
        .map_err(|e| e.context(source_context(path)))
}

/// Load settings from an in-memory TOML document plus the environment
pub fn load_settings_from_str<T: DeserializeOwned>(toml: &str, env_prefix: &str) -> Result<T> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .add_source(environment(env_prefix))
        .build()
        .and_then(|c| c.try_deserialize::<T>())
        .map_err(|e| Error::from(e).with_context("settings", "parse"))
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn source_context(path: Option<&Path>) -> ErrorContext {
    let ctx = ErrorContext::new("settings", "load");
    match path {
        Some(path) => ctx.with_details(path.display().to_string()),
        None => ctx,
    }
}
