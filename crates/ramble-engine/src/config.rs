use serde::{Deserialize, Serialize};

/// How the broadcast pinner reacts to a failing endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// The first failing endpoint aborts the broadcast.
    #[default]
    FailFast,
    /// Failing endpoints are skipped; the result lists the ones that pinned.
    BestEffort,
}

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Address of the comments contract: log source and transaction target.
    pub contract: String,
    /// Account that sends reference transactions.
    pub sender: String,
    /// Debug mode: correlate one log at a time.
    pub sequential: bool,
    /// Concurrent retrievals per correlation when not sequential.
    pub fan_out: usize,
    pub broadcast_mode: BroadcastMode,
    /// Cap on publish attempts. `None` means one attempt per pool endpoint
    /// plus one, the same bound retrieval uses.
    pub max_publish_attempts: Option<usize>,
}

impl EngineConfig {
    /// Correlation concurrency, never zero.
    pub fn concurrency(&self) -> usize {
        if self.sequential {
            1
        } else {
            self.fan_out.max(1)
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract: String::new(),
            sender: String::new(),
            sequential: false,
            fan_out: 8,
            broadcast_mode: BroadcastMode::FailFast,
            max_publish_attempts: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_modes() {
        let mut config = EngineConfig::default();
        assert_eq!(config.concurrency(), 8);
        config.sequential = true;
        assert_eq!(config.concurrency(), 1);
        config.sequential = false;
        config.fan_out = 0;
        assert_eq!(config.concurrency(), 1);
    }
}
