use std::path::{Path, PathBuf};
use std::sync::Mutex;

use content_core::{ResourceType, Space};
use tracing::{debug, warn};

use super::error::{id_from_stem, record_filename};
use super::{ContentStore, Precondition, StoreError};
use crate::diff::Inventory;
use crate::resource::{Resource, ResourceRecord};

/// Filesystem-backed resource persistence.
///
/// ```text
/// <data_dir>/
///   decoders/
///     draft/
///       d1.json        <- {"document": ..., "space": ..., "hash": ...}
///     test/
///   policy/
///     draft/
///       <uuid>.json
/// ```
///
/// Reads go straight to disk. Writes (including the precondition check) are
/// serialized through one mutex and land via write-then-rename, so readers
/// never observe a half-written record.
pub struct FileStore {
    base_dir: PathBuf,
    pretty: bool,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        if !base_dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                base_dir.display()
            )));
        }
        Ok(Self {
            base_dir,
            pretty: true,
            write_lock: Mutex::new(()),
        })
    }

    /// Write records as compact JSON instead of pretty-printed.
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn space_dir(&self, resource_type: ResourceType, space: Space) -> PathBuf {
        self.base_dir
            .join(resource_type.as_str())
            .join(space.as_str())
    }

    fn record_path(&self, resource_type: ResourceType, space: Space, id: &str) -> PathBuf {
        self.space_dir(resource_type, space).join(record_filename(id))
    }

    fn read_record(
        &self,
        resource_type: ResourceType,
        space: Space,
        path: &Path,
    ) -> Result<Option<Resource>, StoreError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: ResourceRecord = serde_json::from_str(&json)?;
        let resource = Resource::from_record(resource_type, record)?;
        if resource.space != space {
            warn!(
                path = %path.display(),
                stored = %resource.space,
                "record space does not match its directory; using the directory"
            );
            return Ok(Some(resource.in_space(space)));
        }
        Ok(Some(resource))
    }

    fn current_digest(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<Option<String>, StoreError> {
        let path = self.record_path(resource_type, space, id);
        Ok(self
            .read_record(resource_type, space, &path)?
            .map(|r| r.digest))
    }
}

impl ContentStore for FileStore {
    fn get(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<Option<Resource>, StoreError> {
        let path = self.record_path(resource_type, space, id);
        self.read_record(resource_type, space, &path)
    }

    fn put_if(&self, resource: &Resource, precondition: Precondition) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("file store lock poisoned");
        let current = self.current_digest(resource.resource_type, resource.space, &resource.id)?;
        precondition.check(resource.resource_type, &resource.id, current.as_deref())?;

        let dir = self.space_dir(resource.resource_type, resource.space);
        std::fs::create_dir_all(&dir)?;
        let record = resource.to_record();
        let json = if self.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };

        let path = dir.join(record_filename(&resource.id));
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        debug!(
            resource_type = %resource.resource_type,
            space = %resource.space,
            id = %resource.id,
            "record written"
        );
        Ok(())
    }

    fn delete_if(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
        precondition: Precondition,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().expect("file store lock poisoned");
        let current = self.current_digest(resource_type, space, id)?;
        precondition.check(resource_type, id, current.as_deref())?;
        if current.is_none() {
            return Ok(false);
        }
        std::fs::remove_file(self.record_path(resource_type, space, id))?;
        debug!(resource_type = %resource_type, space = %space, id, "record deleted");
        Ok(true)
    }

    fn list_ids_and_digests(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Inventory, StoreError> {
        let dir = self.space_dir(resource_type, space);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Inventory::new()),
            Err(e) => return Err(e.into()),
        };

        let mut inventory = Inventory::new();
        for entry in entries {
            let path = entry?.path();
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            let Some(resource) = self.read_record(resource_type, space, &path)? else {
                continue;
            };
            if id_from_stem(stem).as_deref() != Some(resource.id.as_str()) {
                warn!(
                    path = %path.display(),
                    id = %resource.id,
                    "record id does not match its filename; skipping"
                );
                continue;
            }
            inventory.insert(resource.id, resource.digest);
        }
        Ok(inventory)
    }
}
