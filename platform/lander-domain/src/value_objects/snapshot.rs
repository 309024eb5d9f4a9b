use serde::{Deserialize, Serialize};

/// One `(episodeIndex, reward)` pair of the status history tail.
///
/// Encoded on the wire as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample(pub u64, pub f64);

impl HistorySample {
    pub fn episode(&self) -> u64 {
        self.0
    }

    pub fn reward(&self) -> f64 {
        self.1
    }
}

/// Status projection of the remote training job at one poll instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub running: bool,
    pub has_agent: bool,
    #[serde(rename = "episodes")]
    pub episode_count: u64,
    #[serde(default)]
    pub last_reward: Option<f64>,
    #[serde(default)]
    pub epsilon: Option<f64>,
    pub memory_size: u64,
    #[serde(default)]
    pub history_tail: Vec<HistorySample>,
}

impl Snapshot {
    /// Checks the invariants a well-formed server snapshot must hold.
    pub fn validate(&self) -> Result<(), String> {
        for pair in self.history_tail.windows(2) {
            if pair[1].episode() < pair[0].episode() {
                return Err(format!(
                    "historyTail out of order: episode {} follows {}",
                    pair[1].episode(),
                    pair[0].episode()
                ));
            }
        }
        if let Some(sample) = self.history_tail.iter().find(|s| !s.reward().is_finite()) {
            return Err(format!(
                "historyTail has non-finite reward at episode {}",
                sample.episode()
            ));
        }
        Ok(())
    }
}
