//! Reading and writing serde types as files.
//!
//! Paths are given without an extension, the [`Format`] appends its own.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{de::DeserializeOwned, Serialize};

/// How a value is laid out on disk.
pub trait Format {
    const EXT: &'static str;

    fn encode<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(data: &[u8]) -> anyhow::Result<T>;

    fn path(path: &Path) -> PathBuf {
        path.with_extension(Self::EXT)
    }
}

/// Pretty printed, so the file can be edited by hand
pub struct Json;

impl Format for Json {
    const EXT: &'static str = "json";

    fn encode<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(data)?)
    }

    fn decode<T: DeserializeOwned>(data: &[u8]) -> anyhow::Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

pub struct Yaml;

impl Format for Yaml {
    const EXT: &'static str = "yml";

    fn encode<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<Vec<u8>> {
        Ok(serde_yaml::to_string(data)?.into_bytes())
    }

    fn decode<T: DeserializeOwned>(data: &[u8]) -> anyhow::Result<T> {
        Ok(serde_yaml::from_slice(data)?)
    }
}

pub async fn save<K, T>(data: &T, path: &Path) -> anyhow::Result<()>
where
    K: Format,
    T: Serialize + ?Sized,
{
    let path = K::path(path);
    log::trace!("saving {}", path.display());
    let data = K::encode(data).with_context(|| format!("cannot encode {}", path.display()))?;
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("cannot write {}", path.display()))
}

pub async fn load<K, T>(path: &Path) -> anyhow::Result<T>
where
    K: Format,
    T: DeserializeOwned,
{
    let path = K::path(path);
    log::trace!("loading {}", path.display());
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    K::decode(&data).with_context(|| format!("cannot decode {}", path.display()))
}
