use crate::chart::config::ChartConfig;
use crate::model::ChartError;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartSlot {
    Price,
    Volume,
}

impl fmt::Display for ChartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartSlot::Price => f.write_str("price"),
            ChartSlot::Volume => f.write_str("volume"),
        }
    }
}

/// Whatever actually draws charts. A handle stays valid until passed back
/// to `destroy`, which releases everything bound to it.
pub trait ChartBackend {
    type Handle;

    fn create(&mut self, slot: ChartSlot, config: &ChartConfig) -> Result<Self::Handle, ChartError>;

    fn destroy(&mut self, handle: Self::Handle);
}

/// Writes each live chart as a Chart.js config file and removes it on destroy.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, slot: ChartSlot) -> PathBuf {
        self.dir.join(format!("{}_chart.json", slot))
    }
}

impl ChartBackend for JsonFileBackend {
    type Handle = PathBuf;

    fn create(&mut self, slot: ChartSlot, config: &ChartConfig) -> Result<PathBuf, ChartError> {
        let fail = |reason: String| ChartError::CreateFailed { slot: slot.to_string(), reason };

        fs::create_dir_all(&self.dir).map_err(|e| fail(e.to_string()))?;
        let body = serde_json::to_string_pretty(config).map_err(|e| fail(e.to_string()))?;
        let path = self.path_for(slot);
        fs::write(&path, body).map_err(|e| fail(e.to_string()))?;
        info!("Wrote {} chart: {}", slot, path.display());
        Ok(path)
    }

    fn destroy(&mut self, handle: PathBuf) {
        if let Err(e) = fs::remove_file(&handle) {
            warn!("Failed to remove chart file {}: {}", handle.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::config::volume_chart;
    use crate::model::{Timeframe, TimeSeries};

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mt5view-{}-{}", name, std::process::id()))
    }

    #[test]
    fn create_writes_and_destroy_removes() {
        let dir = scratch_dir("backend");
        let mut backend = JsonFileBackend::new(&dir);
        let cfg = volume_chart(&TimeSeries::default(), &Timeframe::Hour1);

        let handle = backend.create(ChartSlot::Volume, &cfg).unwrap();
        assert_eq!(handle, dir.join("volume_chart.json"));
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&handle).unwrap()).unwrap();
        assert_eq!(written["type"], "bar");

        backend.destroy(handle.clone());
        assert!(!handle.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
