use super::{SessionRecord, Store, StoreError, TournamentRecord};
use crate::event::{
    ContainerRatingSummary, EventKind, GlobalPlayerRating, GroupId, PlayerId, RatingHistoryEntry,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory-backed JSON store: one pretty-printed document per file.
///
/// Layout under the data directory:
/// ```text
/// groups/<group>/sessions/<id>.json
/// groups/<group>/tournaments/<id>.json
/// players/<player>/history/<container>.<kind>.<seq>.json
/// players/<player>/rating.json
/// groups/<group>/summaries/<container>.<kind>.json
/// ```
///
/// Ledger entries are keyed by their file name, so writing the same entry
/// twice overwrites the same document and the upsert is idempotent for free.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    fn entry_path(&self, entry: &RatingHistoryEntry) -> PathBuf {
        let name = format!(
            "{}.{}.{:05}.json",
            safe_component(&entry.container_id),
            entry.kind.tag(),
            entry.sequence_number,
        );
        self.root
            .join("players")
            .join(safe_component(&entry.player_id))
            .join("history")
            .join(name)
    }

    fn snapshot_path(&self, player_id: &str) -> PathBuf {
        self.root
            .join("players")
            .join(safe_component(player_id))
            .join("rating.json")
    }

    fn read_collection<T: DeserializeOwned>(&self, dir: PathBuf) -> Result<Vec<T>, StoreError> {
        let mut paths = match json_files(&dir)? {
            Some(paths) => paths,
            None => return Ok(vec![]),
        };
        // Stable read order regardless of directory enumeration order.
        paths.sort();
        paths.into_iter().map(|path| read_json(&path)).collect()
    }

    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Store for JsonStore {
    fn group_ids(&self) -> Result<Vec<GroupId>, StoreError> {
        let mut ids = match subdirectories(&self.root.join("groups"))? {
            Some(names) => names,
            None => return Ok(vec![]),
        };
        ids.sort();
        Ok(ids)
    }

    fn sessions(&self, group_id: &str) -> Result<Vec<SessionRecord>, StoreError> {
        self.read_collection(
            self.root
                .join("groups")
                .join(safe_component(group_id))
                .join("sessions"),
        )
    }

    fn tournaments(&self, group_id: &str) -> Result<Vec<TournamentRecord>, StoreError> {
        self.read_collection(
            self.root
                .join("groups")
                .join(safe_component(group_id))
                .join("tournaments"),
        )
    }

    fn players_with_history(&self) -> Result<Vec<PlayerId>, StoreError> {
        let mut players = match subdirectories(&self.root.join("players"))? {
            Some(names) => names,
            None => return Ok(vec![]),
        };
        players.retain(|p| {
            matches!(
                json_files(&self.root.join("players").join(p).join("history")),
                Ok(Some(files)) if !files.is_empty()
            )
        });
        players.sort();
        Ok(players)
    }

    fn player_history(&self, player_id: &str) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        self.read_collection(
            self.root
                .join("players")
                .join(safe_component(player_id))
                .join("history"),
        )
    }

    fn upsert_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.write_doc(&self.entry_path(entry), entry)?;
        }
        Ok(())
    }

    fn append_history(&mut self, entries: &[RatingHistoryEntry]) -> Result<(), StoreError> {
        // Key-named files make append and upsert the same write.
        self.upsert_history(entries)
    }

    fn snapshot(&self, player_id: &str) -> Result<Option<GlobalPlayerRating>, StoreError> {
        let path = self.snapshot_path(player_id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn put_snapshot(&mut self, snapshot: &GlobalPlayerRating) -> Result<(), StoreError> {
        self.write_doc(&self.snapshot_path(&snapshot.player_id), snapshot)
    }

    fn put_container_summary(
        &mut self,
        summary: &ContainerRatingSummary,
    ) -> Result<(), StoreError> {
        let name = format!(
            "{}.{}.json",
            safe_component(&summary.container_id),
            summary.kind.tag(),
        );
        let path = self
            .root
            .join("groups")
            .join(safe_component(&summary.group_id))
            .join("summaries")
            .join(name);
        self.write_doc(&path, summary)
    }
}

/// Document ids become path components; anything outside the id alphabet the
/// upstream store uses is replaced so ids can never escape the data directory.
fn safe_component(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// `Ok(None)` when the directory does not exist, which reads as an empty
/// collection rather than an error.
fn json_files(dir: &Path) -> Result<Option<Vec<PathBuf>>, StoreError> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io { path: dir.to_path_buf(), source });
        }
    };
    let mut paths = vec![];
    for dirent in read_dir {
        let dirent = dirent.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dirent.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    Ok(Some(paths))
}

fn subdirectories(dir: &Path) -> Result<Option<Vec<String>>, StoreError> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io { path: dir.to_path_buf(), source });
        }
    };
    let mut names = vec![];
    for dirent in read_dir {
        let dirent = dirent.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if dirent.path().is_dir() {
            if let Some(name) = dirent.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(Some(names))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
