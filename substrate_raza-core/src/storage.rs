//! Export of density snapshots as json files.
//!
//! Every save point is written to its own file inside the storage folder.
//! A `manifest.json` file indexes all snapshots by iteration and simulation time.
use std::error::Error;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error related to storing and reading snapshots or configuration files
#[derive(Debug)]
pub enum StorageError {
    /// Error related to File Io operations.
    IoError(std::io::Error),
    /// Occurs during parsing of json structs.
    SerdeJsonError(serde_json::Error),
    /// Occurs during parsing of Xml structs.
    FastXmlDeserializeError(quick_xml::DeError),
    /// Storage location could not be initialized
    InitError(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerdeJsonError(err)
    }
}

impl From<quick_xml::DeError> for StorageError {
    fn from(err: quick_xml::DeError) -> Self {
        StorageError::FastXmlDeserializeError(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::SerdeJsonError(message) => write!(f, "{}", message),
            StorageError::FastXmlDeserializeError(message) => write!(f, "{}", message),
            StorageError::IoError(message) => write!(f, "{}", message),
            StorageError::InitError(message) => write!(f, "{}", message),
        }
    }
}

impl Error for StorageError {}

/// All densities at one point in time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensitySnapshot {
    /// Number of completed time steps
    pub iteration: u64,
    /// Simulation time
    pub time: f64,
    /// Number of voxels along every axis
    pub n_voxels: [usize; 3],
    /// Names of the substrates in storage order
    pub substrates: Vec<String>,
    /// Densities indexed by `voxel * substrates.len() + substrate`
    pub densities: Vec<f64>,
}

/// Entry of the [SnapshotManifest]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Number of completed time steps
    pub iteration: u64,
    /// Simulation time
    pub time: f64,
    /// Name of the snapshot file relative to the storage folder
    pub file: String,
}

/// Time-ordered index of all stored snapshots
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Entries sorted by iteration
    pub entries: Vec<ManifestEntry>,
}

/// Writes [DensitySnapshot]s with [serde_json].
#[derive(Clone, Debug)]
pub struct JsonSnapshotWriter {
    path: PathBuf,
    manifest: SnapshotManifest,
}

impl JsonSnapshotWriter {
    const MANIFEST: &'static str = "manifest.json";

    /// Opens an existing storage folder or creates a new one
    pub fn open_or_create(location: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = location.as_ref().to_path_buf();
        if path.is_file() {
            return Err(StorageError::InitError(format!(
                "storage location {} is a file",
                path.display()
            )));
        }
        std::fs::create_dir_all(&path)?;
        let manifest_path = path.join(Self::MANIFEST);
        let manifest = if manifest_path.is_file() {
            let file = std::fs::File::open(&manifest_path)?;
            serde_json::from_reader(std::io::BufReader::new(file))?
        } else {
            SnapshotManifest::default()
        };
        Ok(Self { path, manifest })
    }

    /// Folder in which all files are stored
    pub fn get_path(&self) -> &Path {
        &self.path
    }

    /// Index of all stored snapshots
    pub fn manifest(&self) -> &SnapshotManifest {
        &self.manifest
    }

    fn snapshot_file_name(iteration: u64) -> String {
        format!("snapshot_{:020.0}.json", iteration)
    }

    /// Writes the snapshot and updates the manifest.
    ///
    /// A snapshot of an already stored iteration is overwritten.
    pub fn store(&mut self, snapshot: &DensitySnapshot) -> Result<PathBuf, StorageError> {
        let file_name = Self::snapshot_file_name(snapshot.iteration);
        let save_path = self.path.join(&file_name);
        let mut writer = std::io::BufWriter::new(std::fs::File::create(&save_path)?);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;

        self.manifest
            .entries
            .retain(|entry| entry.iteration != snapshot.iteration);
        self.manifest.entries.push(ManifestEntry {
            iteration: snapshot.iteration,
            time: snapshot.time,
            file: file_name,
        });
        self.manifest.entries.sort_by_key(|entry| entry.iteration);

        let mut writer =
            std::io::BufWriter::new(std::fs::File::create(self.path.join(Self::MANIFEST))?);
        serde_json::to_writer_pretty(&mut writer, &self.manifest)?;
        writer.flush()?;
        Ok(save_path)
    }

    /// Reads the snapshot of the given iteration
    pub fn load(&self, iteration: u64) -> Result<DensitySnapshot, StorageError> {
        let file = std::fs::File::open(self.path.join(Self::snapshot_file_name(iteration)))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// All iterations contained in the manifest
    pub fn get_all_iterations(&self) -> Vec<u64> {
        self.manifest.entries.iter().map(|e| e.iteration).collect()
    }
}
