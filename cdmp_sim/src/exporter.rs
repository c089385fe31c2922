//! JSON exporter for run analysis.
//!
//! Collects every turn's [`TurnRecord`] together with the run summary so a
//! run can be inspected (or reproduced from its seed) offline.

use crate::error::Result;
use cdmp_core::{PolicyConfig, TurnRecord, TurnRecorder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Policy the model applied
    pub policy: PolicyConfig,

    /// All turns, in order
    pub turns: Vec<TurnRecord>,

    /// Final results
    pub passed: bool,

    /// Winning position at the last turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_position: Option<f64>,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, policy: PolicyConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            policy,
            turns: Vec::new(),
            passed: false,
            winning_position: None,
        }
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, winning_position: Option<f64>) {
        self.passed = passed;
        self.winning_position = winning_position;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Reads an export back.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl TurnRecorder for RunExport {
    fn record_turn(&mut self, record: &TurnRecord) -> cdmp_core::Result<()> {
        self.turns.push(record.clone());
        Ok(())
    }
}
