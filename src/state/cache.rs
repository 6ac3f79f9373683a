use chrono::{DateTime, Utc};
use log::{debug, warn};
use mnps_api::{RawMatchupRecord, Roster, SeasonKey, User, WeekNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Everything needed to rebuild a season without the network: the raw feed,
/// not the derived tables, so a policy change re-derives on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSeason {
    pub key: SeasonKey,
    pub complete: bool,
    pub rosters: Vec<Roster>,
    pub users: Vec<User>,
    pub weeks: BTreeMap<WeekNumber, Vec<RawMatchupRecord>>,
    pub fetched_at: DateTime<Utc>,
}

/// Storage port for fetched seasons.
pub trait SeasonCache: Send + Sync {
    /// `None` on a miss, including an unreadable or foreign entry.
    fn load(&self, key: &SeasonKey) -> Option<CachedSeason>;
    fn save(&self, season: &CachedSeason) -> io::Result<()>;
}

/// One JSON file per season under a cache directory, named by
/// [`SeasonKey::cache_name`].
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &SeasonKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.cache_name()))
    }
}

impl SeasonCache for FileCache {
    fn load(&self, key: &SeasonKey) -> Option<CachedSeason> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedSeason>(&raw) {
            Ok(cached) if cached.key == *key => {
                debug!("cache hit for {key} ({})", path.display());
                Some(cached)
            }
            Ok(cached) => {
                debug!("cache entry {} belongs to {}", path.display(), cached.key);
                None
            }
            Err(e) => {
                warn!("ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn save(&self, season: &CachedSeason) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&season.key);
        let json = serde_json::to_string(season).map_err(io::Error::other)?;
        // Write then rename, so a crash never leaves half a file behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        debug!("cached {} at {}", season.key, path.display());
        Ok(())
    }
}

/// Cache that never hits and discards writes (`--no-cache`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl SeasonCache for NoCache {
    fn load(&self, _key: &SeasonKey) -> Option<CachedSeason> {
        None
    }

    fn save(&self, _season: &CachedSeason) -> io::Result<()> {
        Ok(())
    }
}
