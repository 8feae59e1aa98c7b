//! Threshold Alerts
//!
//! Alert rules watch the spread z-score of one `(y, x, window)` pair. A rule
//! is either armed or cooling down; firing moves it to cooling down until
//! `cooldown_seconds` have passed since `last_triggered`.
//!
//! # Concurrency
//!
//! Every rule sits behind its own mutex, and the armed check plus the
//! `last_triggered` update happen under that lock, so two concurrent
//! evaluations cannot both fire the same rule. Rules never interact.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tick::Symbol;

/// Default cooldown between firings of one rule.
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

// =============================================================================
// Rule Types
// =============================================================================

/// Which side of the threshold breaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    /// `z > threshold`.
    Above,
    /// `z < threshold`.
    Below,
    /// `|z| > threshold`.
    #[default]
    Abs,
}

impl AlertDirection {
    /// Whether `zscore` breaches `threshold` in this direction.
    #[must_use]
    pub fn breached(self, zscore: f64, threshold: f64) -> bool {
        match self {
            Self::Above => zscore > threshold,
            Self::Below => zscore < threshold,
            Self::Abs => zscore.abs() > threshold,
        }
    }
}

/// Alert registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlertRule {
    /// Dependent symbol.
    pub y: Symbol,
    /// Independent symbol.
    pub x: Symbol,
    /// Rolling window the rule applies to.
    pub window: usize,
    /// Z-score threshold.
    pub threshold: f64,
    /// Breach direction.
    #[serde(default)]
    pub direction: AlertDirection,
    /// Minimum seconds between firings.
    #[serde(default = "default_cooldown", alias = "cooldown")]
    pub cooldown_seconds: u64,
}

const fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN_SECONDS
}

/// A registered alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Generated identifier.
    pub id: Uuid,
    /// Dependent symbol.
    pub y: Symbol,
    /// Independent symbol.
    pub x: Symbol,
    /// Rolling window the rule applies to.
    pub window: usize,
    /// Z-score threshold.
    pub threshold: f64,
    /// Breach direction.
    pub direction: AlertDirection,
    /// Minimum seconds between firings.
    pub cooldown_seconds: u64,
    /// Time of the most recent firing.
    pub last_triggered: Option<DateTime<Utc>>,
}

/// Lifecycle state of a rule at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// The rule may fire.
    Armed,
    /// The rule fired recently and is suppressed.
    CoolingDown {
        /// When the rule re-arms.
        until: DateTime<Utc>,
    },
}

impl AlertRule {
    fn from_request(request: NewAlertRule) -> Self {
        Self {
            id: Uuid::new_v4(),
            y: request.y,
            x: request.x,
            window: request.window,
            threshold: request.threshold,
            direction: request.direction,
            cooldown_seconds: request.cooldown_seconds,
            last_triggered: None,
        }
    }

    /// Whether this rule watches the given pair and window.
    #[must_use]
    pub fn matches(&self, y: &str, x: &str, window: usize) -> bool {
        self.y == y && self.x == x && self.window == window
    }

    /// State of the rule at `now`.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> AlertState {
        let Some(last) = self.last_triggered else {
            return AlertState::Armed;
        };
        let until = i64::try_from(self.cooldown_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|cooldown| last.checked_add_signed(cooldown))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now > until {
            AlertState::Armed
        } else {
            AlertState::CoolingDown { until }
        }
    }

    /// Fire if armed and breached; returns the emitted alert.
    fn try_fire(&mut self, zscore: f64, now: DateTime<Utc>) -> Option<TriggeredAlert> {
        if !self.direction.breached(zscore, self.threshold) {
            return None;
        }
        if self.state_at(now) != AlertState::Armed {
            return None;
        }
        self.last_triggered = Some(now);
        Some(TriggeredAlert {
            alert_id: self.id,
            message: format!("Z-score {zscore:.2} breached {:.2}", self.threshold),
        })
    }
}

/// An alert emitted by an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    /// Rule that fired.
    pub alert_id: Uuid,
    /// Human-readable breach description.
    pub message: String,
}

// =============================================================================
// Registry
// =============================================================================

/// Process-wide registry of alert rules.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    rules: RwLock<Vec<Arc<Mutex<AlertRule>>>>,
}

impl AlertRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule and return it with its generated id.
    pub fn register(&self, request: NewAlertRule) -> AlertRule {
        let rule = AlertRule::from_request(request);
        self.rules.write().push(Arc::new(Mutex::new(rule.clone())));
        tracing::info!(
            alert_id = %rule.id,
            y = %rule.y,
            x = %rule.x,
            window = rule.window,
            threshold = rule.threshold,
            "Alert rule registered"
        );
        rule
    }

    /// All rules with their current `last_triggered`, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<AlertRule> {
        self.rules.read().iter().map(|rule| rule.lock().clone()).collect()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Evaluate every rule watching `(y, x, window)` against `zscore`.
    pub fn evaluate(
        &self,
        y: &str,
        x: &str,
        window: usize,
        zscore: f64,
        now: DateTime<Utc>,
    ) -> Vec<TriggeredAlert> {
        if !zscore.is_finite() {
            return Vec::new();
        }
        let rules: Vec<Arc<Mutex<AlertRule>>> = self.rules.read().iter().cloned().collect();

        rules
            .iter()
            .filter_map(|rule| {
                let mut rule = rule.lock();
                if !rule.matches(y, x, window) {
                    return None;
                }
                rule.try_fire(zscore, now)
            })
            .inspect(|alert| {
                tracing::info!(alert_id = %alert.alert_id, message = %alert.message, "Alert triggered");
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
