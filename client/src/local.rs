//! One-entry local persistence: the last display name this user chose,
//! read back at startup to pre-populate the mirror.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalData {
    name: Option<String>,
}

pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(LocalStore {
            path: data_dir.as_ref().join("local.json"),
        })
    }

    /// The persisted name, if any. A missing or unreadable file is just an
    /// empty store.
    pub fn load_name(&self) -> Option<String> {
        let text = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str::<LocalData>(&text).ok()?.name
    }

    pub fn store_name(&self, name: &str) -> io::Result<()> {
        let data = LocalData {
            name: Some(name.to_string()),
        };
        let json = serde_json::to_string(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }
}
