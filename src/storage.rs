use crate::model::{Assignment, RequiredSlot};
use crate::scheduler::PlanOutcome;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

/// Lot d'affectations persisté pour un mois.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBatch {
    pub batch_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub generated_at: DateTime<Utc>,
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub unfilled: Vec<RequiredSlot>,
    #[serde(default)]
    pub swap_count: u32,
}

impl MonthBatch {
    pub fn new(year: i32, month: u32, assignments: Vec<Assignment>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            year,
            month,
            generated_at: Utc::now(),
            assignments,
            unfilled: Vec::new(),
            swap_count: 0,
        }
    }

    pub fn from_outcome(year: i32, month: u32, outcome: &PlanOutcome) -> Self {
        Self {
            unfilled: outcome.unfilled.clone(),
            swap_count: outcome.swap_count,
            ..Self::new(year, month, outcome.assignments.clone())
        }
    }

    pub fn key(&self) -> String {
        month_key(self.year, self.month)
    }
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Archive de tous les mois planifiés, indexée par `YYYY-MM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanArchive {
    #[serde(default)]
    pub months: BTreeMap<String, MonthBatch>,
}

pub trait Storage {
    /// Charge l'archive depuis un support.
    fn load(&self) -> anyhow::Result<PlanArchive>;
    /// Sauvegarde de manière atomique.
    fn save(&self, archive: &PlanArchive) -> anyhow::Result<()>;

    fn load_month(&self, year: i32, month: u32) -> anyhow::Result<Option<MonthBatch>> {
        Ok(self.load()?.months.remove(&month_key(year, month)))
    }

    /// Remplace en bloc le lot du mois ; retourne l'ancien lot s'il existait.
    fn replace_month(&self, batch: MonthBatch) -> anyhow::Result<Option<MonthBatch>> {
        let mut archive = self.load()?;
        let previous = archive.months.insert(batch.key(), batch);
        self.save(&archive)?;
        Ok(previous)
    }
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStorage {
    /// Un fichier absent vaut une archive vide.
    fn load(&self) -> anyhow::Result<PlanArchive> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(PlanArchive::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let archive: PlanArchive =
            serde_json::from_slice(&data).with_context(|| "parsing plan archive")?;
        Ok(archive)
    }

    fn save(&self, archive: &PlanArchive) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(archive)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        info!(path = %self.path.display(), months = archive.months.len(), "plan archive saved");
        Ok(())
    }
}
