// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::sr_data::DEFAULT_EASE_FACTOR;

/// The lowest ease factor a card can have.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Everything tunable about a collection, read from `config.toml`. Every
/// field has a default, so an empty or missing file is valid.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
}

/// Constants of the scheduling state machine. Ladders and intervals are in
/// days.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub learning_steps: Vec<u32>,
    pub relearning_steps: Vec<u32>,
    pub graduating_interval: u32,
    pub easy_interval: u32,
    pub max_interval: u32,
    pub starting_ease: f64,
    pub min_ease: f64,
    pub lapse_ease_penalty: f64,
    pub hard_ease_penalty: f64,
    pub easy_ease_bonus: f64,
    pub hard_multiplier: f64,
    pub easy_multiplier: f64,
    pub lapse_recovery_factor: f64,
    pub mastery: MasteryThresholds,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: vec![1, 3],
            relearning_steps: vec![1],
            graduating_interval: 1,
            easy_interval: 4,
            max_interval: 365,
            starting_ease: DEFAULT_EASE_FACTOR,
            min_ease: MIN_EASE_FACTOR,
            lapse_ease_penalty: 0.2,
            hard_ease_penalty: 0.15,
            easy_ease_bonus: 0.15,
            hard_multiplier: 1.2,
            easy_multiplier: 1.3,
            lapse_recovery_factor: 0.5,
            mastery: MasteryThresholds::default(),
        }
    }
}

/// When a review card counts as mastered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MasteryThresholds {
    pub interval: u32,
    pub repetitions: u32,
}

impl Default for MasteryThresholds {
    fn default() -> Self {
        Self {
            interval: 21,
            repetitions: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub max_cards: usize,
    pub max_new_cards: usize,
    pub early_practice: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_cards: 50,
            max_new_cards: 20,
            early_practice: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Config {
    /// Load the configuration from a TOML file. A missing file yields the
    /// defaults.
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults.", path.display());
            return Ok(Self::default());
        }
        let content = read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Fallible<()> {
        let s = &self.scheduler;
        if s.learning_steps.is_empty() {
            return fail("scheduler.learning_steps must not be empty.");
        }
        if s.relearning_steps.is_empty() {
            return fail("scheduler.relearning_steps must not be empty.");
        }
        if s.max_interval == 0 {
            return fail("scheduler.max_interval must be at least one day.");
        }
        if s.graduating_interval == 0 || s.easy_interval == 0 {
            return fail("graduation intervals must be at least one day.");
        }
        if s.min_ease.is_nan() || s.min_ease < MIN_EASE_FACTOR {
            return fail(format!("scheduler.min_ease must be at least {MIN_EASE_FACTOR}."));
        }
        if s.starting_ease.is_nan() || s.starting_ease < s.min_ease {
            return fail("scheduler.starting_ease must not be below min_ease.");
        }
        let factors = [
            s.lapse_ease_penalty,
            s.hard_ease_penalty,
            s.easy_ease_bonus,
            s.hard_multiplier,
            s.easy_multiplier,
            s.lapse_recovery_factor,
        ];
        if factors.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return fail("scheduler factors must be finite and non-negative.");
        }
        if s.hard_multiplier < 1.0 || s.easy_multiplier < 1.0 {
            return fail("scheduler.hard_multiplier and easy_multiplier must be at least 1.0.");
        }
        if s.lapse_recovery_factor <= 0.0 {
            return fail("scheduler.lapse_recovery_factor must be positive.");
        }
        if self.session.max_cards == 0 {
            return fail("session.max_cards must be at least one.");
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least one.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_empty_config_is_default() -> Fallible<()> {
        let config = Config::parse("")?;
        assert_eq!(config, Config::default());
        assert_eq!(config.scheduler.learning_steps, vec![1, 3]);
        assert_eq!(config.scheduler.mastery.interval, 21);
        assert_eq!(config.retry.max_attempts, 3);
        Ok(())
    }

    #[test]
    fn test_partial_override() -> Fallible<()> {
        let content = r#"
[scheduler]
learning_steps = [1, 2, 5]
max_interval = 180

[scheduler.mastery]
interval = 30

[session]
early_practice = true
"#;
        let config = Config::parse(content)?;
        assert_eq!(config.scheduler.learning_steps, vec![1, 2, 5]);
        assert_eq!(config.scheduler.max_interval, 180);
        assert_eq!(config.scheduler.easy_interval, 4);
        assert_eq!(config.scheduler.mastery.interval, 30);
        assert_eq!(config.scheduler.mastery.repetitions, 2);
        assert!(config.session.early_practice);
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Config::parse("[scheduler]\nfoo = 1\n").is_err());
    }

    #[test]
    fn test_empty_ladder_is_rejected() {
        let err = Config::parse("[scheduler]\nlearning_steps = []\n").unwrap_err();
        assert_eq!(err.message(), "scheduler.learning_steps must not be empty.");
    }

    #[test]
    fn test_ease_floor_below_minimum_is_rejected() {
        assert!(Config::parse("[scheduler]\nmin_ease = 1.0\n").is_err());
        assert!(Config::parse("[scheduler]\nmin_ease = 1.5\n").is_ok());
    }

    #[test]
    fn test_shrinking_multipliers_are_rejected() {
        assert!(Config::parse("[scheduler]\neasy_multiplier = 0.1\n").is_err());
        assert!(Config::parse("[scheduler]\nhard_multiplier = 0.9\n").is_err());
        assert!(Config::parse("[scheduler]\nlapse_recovery_factor = 0.0\n").is_err());
        assert!(Config::parse("[scheduler]\nlapse_recovery_factor = inf\n").is_err());
        assert!(Config::parse("[scheduler]\nhard_multiplier = 1.0\neasy_multiplier = 1.0\n").is_ok());
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        assert!(Config::parse("[retry]\nmax_attempts = 0\n").is_err());
    }

    #[test]
    fn test_load_missing_file() -> Fallible<()> {
        let dir = tempdir()?;
        let config = Config::load(&dir.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_load_file() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        write(&path, "[session]\nmax_cards = 10\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.session.max_cards, 10);
        Ok(())
    }
}
