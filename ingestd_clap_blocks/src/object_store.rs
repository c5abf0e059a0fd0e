//! CLI handling for object store config (via CLI arguments and environment variables).

use std::{fs, path::PathBuf, sync::Arc};

use object_store::{DynObjectStore, local::LocalFileSystem, memory::InMemory};
use observability_deps::tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ParseError {
    #[error("Unable to create data directory {path:?}: {source}")]
    CreatingDataDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to create local store {path:?}: {source}")]
    CreateLocalFileSystem {
        path: PathBuf,
        source: object_store::Error,
    },

    #[error("Specified {object_store:?} for the object store, required configuration missing for {missing}")]
    MissingObjectStoreConfig {
        object_store: ObjectStoreType,
        missing: &'static str,
    },
}

/// Object-store type.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ObjectStoreType {
    /// In-memory. Everything is lost when the process exits.
    #[default]
    Memory,

    /// Filesystem.
    File,
}

impl ObjectStoreType {
    /// Map enum variant to static string, followed inverse of clap parsing rules.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

/// CLI config for the object store that persisted documents are written to.
#[derive(Debug, Clone, clap::Parser)]
pub struct ObjectStoreConfig {
    /// Which object storage to use.
    ///
    /// Possible values (case insensitive):
    ///
    /// * memory (default): Effectively no object persistence.
    /// * file: Stores documents in the local filesystem. Must also set `--data-dir`.
    #[clap(
        value_enum,
        long = "object-store",
        env = "INGESTD_OBJECT_STORE",
        default_value_t = ObjectStoreType::default(),
        ignore_case = true,
        action,
        verbatim_doc_comment
    )]
    pub object_store: ObjectStoreType,

    /// The location ingestd will use to store documents locally.
    #[clap(long = "data-dir", env = "INGESTD_DATA_DIR", action)]
    pub data_dir: Option<PathBuf>,
}

impl ObjectStoreConfig {
    /// Create config-dependant object store.
    pub fn make_object_store(&self) -> Result<Arc<DynObjectStore>, ParseError> {
        if let Some(data_dir) = &self.data_dir {
            if !matches!(&self.object_store, ObjectStoreType::File) {
                warn!(?data_dir, object_store_type = self.object_store.as_str(),
                      "--data-dir / `INGESTD_DATA_DIR` ignored. It only affects 'file' object stores");
            }
        }

        let object_store: Arc<DynObjectStore> = match &self.object_store {
            ObjectStoreType::Memory => {
                info!(object_store_type = "Memory", "Object Store");
                Arc::new(InMemory::new())
            }
            ObjectStoreType::File => self.new_local_file_system()?,
        };

        Ok(object_store)
    }

    fn new_local_file_system(&self) -> Result<Arc<LocalFileSystem>, ParseError> {
        let data_dir = self
            .data_dir
            .as_ref()
            .ok_or(ParseError::MissingObjectStoreConfig {
                object_store: ObjectStoreType::File,
                missing: "data-dir",
            })?;

        info!(?data_dir, object_store_type = "Directory", "Object Store");
        fs::create_dir_all(data_dir).map_err(|source| ParseError::CreatingDataDirectory {
            path: data_dir.clone(),
            source,
        })?;

        let store = LocalFileSystem::new_with_prefix(data_dir).map_err(|source| {
            ParseError::CreateLocalFileSystem {
                path: data_dir.clone(),
                source,
            }
        })?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn default_object_store_is_memory() {
        let config = ObjectStoreConfig::try_parse_from(["server"]).unwrap();
        assert_eq!(config.object_store, ObjectStoreType::Memory);

        let object_store = config.make_object_store().unwrap();
        assert_eq!(&object_store.to_string(), "InMemory");
    }

    #[test]
    fn explicitly_set_object_store_to_memory() {
        let config =
            ObjectStoreConfig::try_parse_from(["server", "--object-store", "MEMORY"]).unwrap();
        let object_store = config.make_object_store().unwrap();
        assert_eq!(&object_store.to_string(), "InMemory");
    }

    #[test]
    fn valid_file_config() {
        let root = TempDir::new().unwrap();
        let data_dir = root.path().join("nested").join("data");

        let config = ObjectStoreConfig::try_parse_from([
            "server",
            "--object-store",
            "file",
            "--data-dir",
            data_dir.to_str().unwrap(),
        ])
        .unwrap();

        let object_store = config.make_object_store().unwrap();
        assert!(object_store.to_string().starts_with("LocalFileSystem"));
        assert!(data_dir.is_dir());
    }

    #[test]
    fn file_config_missing_params() {
        let config = ObjectStoreConfig::try_parse_from(["server", "--object-store", "file"]).unwrap();

        let err = config.make_object_store().unwrap_err().to_string();

        assert_eq!(
            err,
            "Specified File for the object store, required configuration missing for \
            data-dir"
        );
    }

    #[test]
    fn data_dir_is_not_a_directory() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("occupied");
        fs::write(&file, b"").unwrap();

        let config = ObjectStoreConfig::try_parse_from([
            "server",
            "--object-store",
            "file",
            "--data-dir",
            file.to_str().unwrap(),
        ])
        .unwrap();

        assert!(matches!(
            config.make_object_store(),
            Err(ParseError::CreatingDataDirectory { .. })
        ));
    }

    #[test]
    fn unknown_object_store_type() {
        assert!(ObjectStoreConfig::try_parse_from(["server", "--object-store", "s3"]).is_err());
    }
}
