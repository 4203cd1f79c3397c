//! Saving and loading trained model sets.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::info;

use crate::engine::{MODEL_FORMAT_VERSION, ModelSet};
use crate::{TrafficError, TrafficResult};

/// Storage backend for [`ModelSet`] artifacts.
pub trait ModelStore {
    fn save(&self, set: &ModelSet, path: &Path) -> TrafficResult<()>;

    /// Fails with [`TrafficError::ModelNotFound`] when nothing exists at
    /// `path`.
    fn load(&self, path: &Path) -> TrafficResult<ModelSet>;
}

/// One JSON document per model set.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonModelStore;

impl ModelStore for JsonModelStore {
    fn save(&self, set: &ModelSet, path: &Path) -> TrafficResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut out, set)?;
        out.flush()?;
        info!("saved {} model variants to {}", set.variants.len(), path.display());
        Ok(())
    }

    fn load(&self, path: &Path) -> TrafficResult<ModelSet> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrafficError::ModelNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let set: ModelSet = serde_json::from_reader(BufReader::new(file))?;
        if set.format_version != MODEL_FORMAT_VERSION {
            return Err(TrafficError::IncompatibleArtifact {
                expected: MODEL_FORMAT_VERSION,
                found: set.format_version,
            });
        }
        if set.best_predictor().is_none() {
            return Err(TrafficError::Training(format!(
                "artifact names best model {} but does not contain it",
                set.best
            )));
        }
        Ok(set)
    }
}
