use tracing::debug;

use crate::document::{ControlFile, PostrunFlag};
use crate::error::Result;
use crate::keys;

/// One detector assignment: which channel records under which label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detector {
    pub channel: u8,
    /// Output-file label, e.g. `FID` or `TCD`.
    pub label: String,
}

impl Detector {
    pub fn new(channel: u8, label: impl Into<String>) -> Self {
        Self {
            channel,
            label: label.into(),
        }
    }
}

/// The control-file rewrite applied before an automated collection run.
///
/// Mirrors what operators set up by hand: point the instrument software at
/// the run's output directory, turn on postrun cycling so the instrument
/// collects a whole sample set unattended, label each detector's files, and
/// enable every save/autoincrement flag so no run output is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPlan {
    /// Directory the instrument software saves run output under.
    pub data_path: String,
    /// Collections per sample set; becomes the postrun repeat count.
    pub sample_count: u32,
    /// Detector labels per channel. The first listed channel drives cycling.
    pub detectors: Vec<Detector>,
}

impl AcquisitionPlan {
    /// Plan with the conventional two-detector setup: FID on channel 1
    /// (driving the cycle), TCD on channel 2.
    pub fn new(data_path: impl Into<String>, sample_count: u32) -> Self {
        Self {
            data_path: data_path.into(),
            sample_count,
            detectors: vec![Detector::new(1, "FID"), Detector::new(2, "TCD")],
        }
    }

    /// Replace the detector assignments.
    pub fn with_detectors(mut self, detectors: Vec<Detector>) -> Self {
        self.detectors = detectors;
        self
    }

    /// Rewrite a control file in place per this plan.
    ///
    /// Channels are validated before any edit, so a bad plan leaves the
    /// document untouched.
    pub fn apply(&self, file: &mut ControlFile) -> Result<()> {
        for detector in &self.detectors {
            crate::document::check_channel(detector.channel)?;
        }

        file.set(keys::DATA_FILE_PATH, self.data_path.as_str());

        if let Some(primary) = self.detectors.first() {
            file.set_postrun_cycle(primary.channel, true)?;
            file.set_postrun_repeat(primary.channel, self.sample_count)?;
        }

        for detector in &self.detectors {
            file.set_detector_file(detector.channel, &detector.label)?;
            file.set_postrun_flag(detector.channel, PostrunFlag::SaveData, true)?;
            file.set_postrun_flag(detector.channel, PostrunFlag::SaveResults, true)?;
            file.set_postrun_flag(detector.channel, PostrunFlag::SaveImage, true)?;
            file.set_postrun_flag(detector.channel, PostrunFlag::Autoincrement, true)?;
        }

        debug!(
            data_path = %self.data_path,
            sample_count = self.sample_count,
            detectors = self.detectors.len(),
            "applied acquisition plan"
        );
        Ok(())
    }
}
