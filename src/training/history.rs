// Copyright (C) 2024 Bellande Artificial Intelligence Computer Vision Research Innovation Center, Ronaldson Bellande

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::core::{error::TrainingError, phase::Phase};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Finalized loss and accuracy of one phase in one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// Zero-based epoch index.
    pub epoch: usize,
    pub phase: Phase,
    pub loss: f64,
    pub accuracy: f64,
}

impl fmt::Display for PhaseSummary {
    /// The report line: `<phase> Loss:<loss> Acc:<acc>`, four decimals each.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} Loss:{:.4} Acc:{:.4}", self.phase, self.loss, self.accuracy)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub records: Vec<PhaseSummary>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        TrainingHistory {
            records: Vec::new(),
        }
    }

    pub fn update(&mut self, summary: PhaseSummary) {
        self.records.push(summary);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn for_phase(&self, phase: Phase) -> impl Iterator<Item = &PhaseSummary> + '_ {
        self.records.iter().filter(move |r| r.phase == phase)
    }

    pub fn last(&self, phase: Phase) -> Option<&PhaseSummary> {
        self.for_phase(phase).last()
    }

    /// Highest validation accuracy seen so far, earliest epoch on ties.
    pub fn best_val(&self) -> Option<&PhaseSummary> {
        self.for_phase(Phase::Val).fold(None, |best, r| match best {
            Some(b) if b.accuracy >= r.accuracy => Some(b),
            _ => Some(r),
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn summary(epoch: usize, phase: Phase, accuracy: f64) -> PhaseSummary {
        PhaseSummary {
            epoch,
            phase,
            loss: 0.5,
            accuracy,
        }
    }

    #[test]
    fn report_line_format() {
        let line = PhaseSummary {
            epoch: 1,
            phase: Phase::Train,
            loss: 0.693147,
            accuracy: 0.5,
        }
        .to_string();
        assert_eq!(line, "train Loss:0.6931 Acc:0.5000");
    }

    #[test]
    fn queries_by_phase() {
        let mut history = TrainingHistory::new();
        history.update(summary(0, Phase::Val, 0.5));
        history.update(summary(1, Phase::Train, 0.75));
        history.update(summary(1, Phase::Val, 0.9));
        history.update(summary(2, Phase::Val, 0.9));

        assert_eq!(history.len(), 4);
        assert_eq!(history.for_phase(Phase::Val).count(), 3);
        assert_eq!(history.last(Phase::Train).unwrap().epoch, 1);
        assert_eq!(history.best_val().unwrap().epoch, 1);
    }

    #[test]
    fn json_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let mut history = TrainingHistory::new();
        history.update(summary(0, Phase::Val, 0.5));
        history.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"phase\": \"val\""));
        assert_eq!(TrainingHistory::load(&path).unwrap(), history);
    }
}
