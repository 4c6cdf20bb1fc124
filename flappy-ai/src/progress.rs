use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ql::util::fs::{read_json, write_json};
use serde::{Deserialize, Serialize};

pub const PROGRESS_FILE: &str = "episode_results.json";

/// Score reached in one episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub episode: usize,
    pub score: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    episode_results: Vec<ProgressRecord>,
}

/// Durable list of finished episodes, kept as JSON file.
///
/// Written only while no game worker is running, so there is a single writer.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: PathBuf) -> Self { Self { path } }

    pub fn in_dir(dir: &Path) -> Self { Self::new(dir.join(PROGRESS_FILE)) }

    pub fn path(&self) -> &Path { &self.path }

    /// All persisted records, ordered by episode number.
    /// A missing or undecodable file counts as empty history.
    pub fn load(&self) -> Vec<ProgressRecord> {
        if !self.path.exists() {
            return vec![];
        }
        match read_json::<ProgressFile>(&self.path) {
            Ok(file) => file.episode_results,
            Err(e) => {
                log::warn!("ignoring unreadable progress file: {:#}", e);
                vec![]
            }
        }
    }

    /// Highest persisted episode number
    pub fn last_episode(&self) -> Option<usize> { self.load().iter().map(|r| r.episode).max() }

    /// Merges `records` into the persisted ones and returns the number of records now stored.
    /// A record replaces an already persisted one with the same episode number.
    pub fn append(
        &self,
        records: &[ProgressRecord],
    ) -> Result<usize> {
        let mut merged: BTreeMap<usize, f32> = self.load().into_iter().map(|r| (r.episode, r.score)).collect();
        merged.extend(records.iter().map(|r| (r.episode, r.score)));

        let file = ProgressFile {
            episode_results: merged
                .into_iter()
                .map(|(episode, score)| ProgressRecord { episode, score })
                .collect(),
        };
        write_json(&self.path, &file)?;
        Ok(file.episode_results.len())
    }
}
