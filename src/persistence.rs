//! Model serialization and persistence
//!
//! Models are stored as pretty-printed JSON with a small metadata header.
//! The file format is private to this crate; it is not libsvm's text format.

use crate::core::{BridgeError, EngineModel, Result, SvmType};
use crate::engine::NativeModel;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// On-disk representation of a trained model
#[derive(Serialize, Deserialize)]
pub struct SerializableModel {
    pub metadata: ModelMetadata,
    pub model: NativeModel,
}

/// Model metadata for tracking and validation
#[derive(Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub svm_type: SvmType,
    pub nr_class: usize,
    pub n_support_vectors: usize,
    pub created_at: DateTime<Utc>,
}

impl SerializableModel {
    pub fn from_model(model: &NativeModel) -> Self {
        Self {
            metadata: ModelMetadata {
                library_version: crate::VERSION.to_string(),
                svm_type: model.svm_type(),
                nr_class: model.nr_class(),
                n_support_vectors: model.support_vector_count(),
                created_at: Utc::now(),
            },
            model: model.clone(),
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| BridgeError::Serialization(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| BridgeError::Serialization(e.to_string()))
    }
}

/// JSON has no encoding for infinities or NaN
fn check_finite(model: &NativeModel) -> Result<()> {
    for (k, decision) in model.decisions().iter().enumerate() {
        let sigmoid = decision.sigmoid().map_or([0.0, 0.0], |s| [s.a, s.b]);
        let finite = decision.rho().is_finite()
            && decision.coefficients().iter().all(|c| c.is_finite())
            && sigmoid.iter().all(|v| v.is_finite());
        if !finite {
            return Err(BridgeError::Serialization(format!(
                "decision function {k} has non-finite parameters"
            )));
        }
    }
    Ok(())
}

/// Write `model` to `path`
pub fn save_model(model: &NativeModel, path: &Path) -> Result<()> {
    check_finite(model)?;
    SerializableModel::from_model(model).save_to_file(path)?;
    debug!("saved model to {}", path.display());
    Ok(())
}

/// Read a model written by [`save_model`]
pub fn load_model(path: &Path) -> Result<NativeModel> {
    let stored = SerializableModel::load_from_file(path)?;
    if stored.metadata.library_version != crate::VERSION {
        warn!(
            "model at {} was written by version {}, running {}",
            path.display(),
            stored.metadata.library_version,
            crate::VERSION
        );
    }
    debug!(
        "loaded {:?} model with {} support vectors from {}",
        stored.metadata.svm_type,
        stored.metadata.n_support_vectors,
        path.display()
    );
    Ok(stored.model)
}
