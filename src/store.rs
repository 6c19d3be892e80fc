//! Persistence of the active conversation id across restarts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, from_reader, to_writer_pretty};

use crate::error::{Error, Result};

/// Key under which the active conversation id is stored.
pub const ACTIVE_CHAT_KEY: &str = "activeChatId";

/// Where the active conversation id lives between runs.
pub trait ActiveChatStore: Send {
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, chat_id: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// A store that forgets everything when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    active: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(chat_id: impl Into<String>) -> Self {
        Self {
            active: Some(chat_id.into()),
        }
    }
}

impl ActiveChatStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.active.clone())
    }

    fn save(&mut self, chat_id: &str) -> Result<()> {
        self.active = Some(chat_id.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.active = None;
        Ok(())
    }
}

/// A store backed by a JSON object on disk.
///
/// Keys other than [`ACTIVE_CHAT_KEY`] are preserved when the file is
/// rewritten.  A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(Error::io("failed to open state file", err)),
        };
        let reader = BufReader::new(file);
        let value: Value = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse state file", Some(Box::new(err)))
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(Error::serialization("state file is not a JSON object", None)),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create state directory", err))?;
        }
        let scratch = self.scratch_path();
        let file = File::create(&scratch)
            .map_err(|err| Error::io("failed to create state file", err))?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, map).map_err(|err| {
            Error::serialization("failed to serialize state file", Some(Box::new(err)))
        })?;
        writer
            .flush()
            .map_err(|err| Error::io("failed to write state file", err))?;
        // Readers only ever see the old file or the complete new one.
        std::fs::rename(&scratch, &self.path)
            .map_err(|err| Error::io("failed to replace state file", err))
    }

    fn scratch_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".tmp");
        PathBuf::from(path)
    }
}

impl ActiveChatStore for FileStore {
    fn load(&self) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map
            .get(ACTIVE_CHAT_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from))
    }

    fn save(&mut self, chat_id: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(
            ACTIVE_CHAT_KEY.to_string(),
            Value::String(chat_id.to_string()),
        );
        self.write_map(&map)
    }

    fn clear(&mut self) -> Result<()> {
        let mut map = self.read_map()?;
        if map.remove(ACTIVE_CHAT_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("luna-store-{}-{name}", std::process::id()))
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("c1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("c1"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let store = FileStore::new(scratch("missing.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_persists_and_keeps_other_keys() {
        let path = scratch("state.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let mut store = FileStore::new(&path);
        store.save("abc").unwrap();
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.load().unwrap().as_deref(), Some("abc"));

        store.clear().unwrap();
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"theme": "dark"}));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn save_replaces_the_file_whole() {
        let path = scratch("atomic.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        let mut store = FileStore::new(&path);
        store.save("abc").unwrap();
        assert!(!store.scratch_path().exists());

        // A write that cannot complete leaves the previous contents in place.
        std::fs::create_dir_all(store.scratch_path()).unwrap();
        let err = store.save("def").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");

        std::fs::remove_dir(store.scratch_path()).unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let path = scratch("corrupt.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let err = FileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
        std::fs::remove_file(&path).unwrap();
    }
}
