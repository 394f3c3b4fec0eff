//! Best-model checkpointing.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use candle_nn::VarMap;
use safetensors::SafeTensors;
use tracing::{debug, info};

/// Single safetensors snapshot of every model variable.
///
/// Writes go to a temporary sibling that is then renamed over the target,
/// so a reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Overwrite the checkpoint with the current variables.
    pub fn save(&self, varmap: &VarMap) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        varmap
            .save(&tmp)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("moving checkpoint into {}", self.path.display()))?;

        debug!(path = %self.path.display(), "checkpoint written");
        Ok(())
    }

    /// Load the checkpoint into a model built on `varmap`.
    ///
    /// Every variable of the map must be present in the file.
    pub fn load(&self, varmap: &mut VarMap) -> anyhow::Result<()> {
        if !self.exists() {
            bail!("checkpoint not found: {}", self.path.display());
        }

        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let stored = SafeTensors::deserialize(&bytes)
            .with_context(|| format!("{} is not a safetensors file", self.path.display()))?;

        let missing: Vec<String> = {
            let vars = varmap
                .data()
                .lock()
                .map_err(|_| anyhow!("variable map lock poisoned"))?;
            let mut missing: Vec<String> = vars
                .keys()
                .filter(|name| stored.tensor(name).is_err())
                .cloned()
                .collect();
            missing.sort();
            missing
        };
        if !missing.is_empty() {
            bail!(
                "checkpoint {} does not match the model, missing: {}",
                self.path.display(),
                missing.join(", ")
            );
        }

        varmap
            .load(&self.path)
            .with_context(|| format!("loading {}", self.path.display()))?;
        info!(path = %self.path.display(), tensors = stored.len(), "checkpoint restored");
        Ok(())
    }
}

/// Best validation accuracy seen so far in a run.
///
/// The first observation always counts as an improvement; afterwards only a
/// strictly greater accuracy does.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestTracker {
    best: Option<f64>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accuracy and report whether it is a new best.
    pub fn observe(&mut self, accuracy: f64) -> bool {
        match self.best {
            Some(best) if accuracy <= best => false,
            _ => {
                self.best = Some(accuracy);
                true
            }
        }
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}
