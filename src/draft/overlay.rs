//! Local draft overlays
//!
//! An overlay is a partial copy of a division's edits kept outside the system
//! of record. The whole set lives in one JSON object keyed by `id:<n>` and
//! `name:<lowercase name>`, so a draft can be found again by either.

use crate::models::{Division, Payee, Program};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Partial edits layered over a division
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dean: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programs_data: Option<Vec<ProgramPatch>>,
}

/// Program edits; deliberately carries no id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payees: Option<Vec<Payee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_been_paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_submitted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgramPatch {
    /// Full patch mirroring every field of a program except its id
    pub fn from_program(program: &Program) -> Self {
        Self {
            program_name: Some(program.program_name.clone()),
            payees: Some(program.payees.clone()),
            has_been_paid: Some(program.has_been_paid),
            report_submitted: Some(program.report_submitted),
            notes: Some(program.notes.clone()),
        }
    }

    /// Program built from the patch alone, used when nothing in the base matches
    pub fn to_program(&self) -> Program {
        Program {
            id: None,
            program_name: self.program_name.clone().unwrap_or_default(),
            payees: self.payees.clone().unwrap_or_default(),
            has_been_paid: self.has_been_paid.unwrap_or(false),
            report_submitted: self.report_submitted.unwrap_or(false),
            notes: self.notes.clone().unwrap_or_default(),
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(self.program_name.as_deref().unwrap_or(""))
    }
}

impl DraftOverlay {
    /// Overlay holding the complete state of a division
    pub fn from_division(division: &Division) -> Self {
        Self {
            id: division.id,
            division_name: Some(division.division_name.clone()),
            dean: Some(division.dean_name.clone()),
            chair: Some(division.chair_name.clone()),
            pen: Some(division.pen_contact.clone()),
            loc: Some(division.loc_rep.clone()),
            notes: Some(division.notes.clone()),
            programs_data: Some(division.program_list.iter().map(ProgramPatch::from_program).collect()),
        }
    }
}

/// Trim and lowercase, the identity used for name matching
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Composite identity of an overlay record
pub struct OverlayKey;

impl OverlayKey {
    /// `id:<n>` for a positive id
    pub fn for_id(id: Option<i64>) -> Option<String> {
        id.filter(|id| *id > 0).map(|id| format!("id:{}", id))
    }

    /// `name:<normalized>` for a non-blank name
    pub fn for_name(name: &str) -> Option<String> {
        let normalized = normalize_name(name);
        (!normalized.is_empty()).then(|| format!("name:{}", normalized))
    }

    /// Every key an overlay for this identity is stored under, id first
    pub fn all(id: Option<i64>, name: &str) -> Vec<String> {
        Self::for_id(id).into_iter().chain(Self::for_name(name)).collect()
    }
}

/// Durable home of the overlay blob, read and written as a whole
pub trait OverlayBackend: Send + Sync {
    /// `Ok(None)` when nothing has been written yet
    fn read_all(&self) -> std::io::Result<Option<String>>;

    fn write_all(&self, blob: &str) -> std::io::Result<()>;
}

/// JSON file replaced atomically on every write
pub struct FileOverlayBackend {
    path: PathBuf,
}

impl FileOverlayBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverlayBackend for FileOverlayBackend {
    fn read_all(&self) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, blob: &str) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let tmp = dir.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("overlays")
        ));
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(blob.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)
    }
}

/// Volatile backend for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryOverlayBackend {
    blob: Mutex<Option<String>>,
}

impl MemoryOverlayBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob, malformed or not
    #[cfg(test)]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl OverlayBackend for MemoryOverlayBackend {
    fn read_all(&self) -> std::io::Result<Option<String>> {
        let guard = self
            .blob
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "overlay blob poisoned"))?;
        Ok(guard.clone())
    }

    fn write_all(&self, blob: &str) -> std::io::Result<()> {
        let mut guard = self
            .blob
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "overlay blob poisoned"))?;
        *guard = Some(blob.to_string());
        Ok(())
    }
}

/// Keyed access to the overlay blob.
///
/// Calls are synchronous: a `put` that returns `Ok` is durable. An unreadable
/// blob or record reads as "no overlay" rather than an error.
pub struct OverlayStore {
    backend: Box<dyn OverlayBackend>,
    /// Serialises read-modify-write cycles on the blob
    lock: Mutex<()>,
}

impl OverlayStore {
    pub fn new(backend: impl OverlayBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryOverlayBackend::new())
    }

    /// Look an overlay up by id key first, then by name key
    pub fn get(&self, id: Option<i64>, name: &str) -> Option<DraftOverlay> {
        let _guard = self.lock.lock().ok()?;
        let map = self.read_map();
        OverlayKey::all(id, name).into_iter().find_map(|key| {
            let value = map.get(&key)?;
            match serde_json::from_value::<DraftOverlay>(value.clone()) {
                Ok(overlay) => Some(overlay),
                Err(e) => {
                    warn!("Ignoring malformed overlay under {}: {}", key, e);
                    None
                }
            }
        })
    }

    /// Upsert the overlay under both of its keys
    pub fn put(&self, id: Option<i64>, name: &str, overlay: &DraftOverlay) -> std::io::Result<()> {
        let keys = OverlayKey::all(id, name);
        if keys.is_empty() {
            debug!("Overlay has neither id nor name, not stored");
            return Ok(());
        }

        let value = serde_json::to_value(overlay)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let _guard = self.lock()?;
        let mut map = self.read_map();
        for key in &keys {
            map.insert(key.clone(), value.clone());
        }
        self.write_map(&map)?;
        debug!("Stored overlay under {}", keys.join(", "));
        Ok(())
    }

    /// Remove both keys; returns whether anything was stored
    pub fn clear(&self, id: Option<i64>, name: &str) -> std::io::Result<bool> {
        let _guard = self.lock()?;
        let mut map = self.read_map();
        let mut removed = false;
        for key in OverlayKey::all(id, name) {
            removed |= map.remove(&key).is_some();
        }
        if removed {
            self.write_map(&map)?;
        }
        Ok(removed)
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "overlay store poisoned"))
    }

    fn read_map(&self) -> Map<String, Value> {
        let raw = match self.backend.read_all() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!("Overlay store unreadable, starting empty: {}", e);
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Overlay store is not a JSON object, starting empty");
                Map::new()
            }
            Err(e) => {
                warn!("Overlay store is not valid JSON, starting empty: {}", e);
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> std::io::Result<()> {
        let blob = serde_json::to_string(map)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.backend.write_all(&blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn overlay(dean: &str) -> DraftOverlay {
        DraftOverlay {
            dean: Some(dean.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(OverlayKey::all(Some(3), "  Arts "), vec!["id:3", "name:arts"]);
        assert_eq!(OverlayKey::all(Some(0), "Arts"), vec!["name:arts"]);
        assert!(OverlayKey::all(None, "   ").is_empty());
    }

    #[test]
    fn test_put_is_reachable_by_either_key() {
        let store = OverlayStore::in_memory();
        store.put(Some(3), "Arts", &overlay("Bo")).unwrap();

        assert_eq!(store.get(Some(3), "").unwrap().dean.as_deref(), Some("Bo"));
        assert_eq!(store.get(None, "ARTS").unwrap().dean.as_deref(), Some("Bo"));
        assert!(store.get(Some(4), "Science").is_none());
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let store = OverlayStore::in_memory();
        store.put(Some(3), "Arts", &overlay("Bo")).unwrap();
        assert!(store.clear(Some(3), "Arts").unwrap());
        assert!(store.get(Some(3), "Arts").is_none());
        assert!(!store.clear(Some(3), "Arts").unwrap());
    }

    #[test]
    fn test_malformed_blob_reads_as_empty_and_is_replaced() {
        let store = OverlayStore::new(MemoryOverlayBackend::with_blob("{not json"));
        assert!(store.get(Some(1), "Arts").is_none());

        store.put(Some(1), "Arts", &overlay("Al")).unwrap();
        assert_eq!(store.get(Some(1), "Arts").unwrap().dean.as_deref(), Some("Al"));
    }

    #[test]
    fn test_malformed_record_falls_through_to_name_key() {
        let blob = r#"{"id:1": {"dean": 42}, "name:arts": {"dean": "Cy"}}"#;
        let store = OverlayStore::new(MemoryOverlayBackend::with_blob(blob));
        assert_eq!(store.get(Some(1), "Arts").unwrap().dean.as_deref(), Some("Cy"));
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("drafts.json");

        OverlayStore::new(FileOverlayBackend::new(&path))
            .put(Some(9), "Science", &overlay("Di"))
            .unwrap();

        let reopened = OverlayStore::new(FileOverlayBackend::new(&path));
        assert_eq!(reopened.get(None, "science").unwrap().dean.as_deref(), Some("Di"));
    }
}
