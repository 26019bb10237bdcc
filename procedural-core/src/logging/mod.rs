//! Structured logging and tracing.
//!
//! Generation reports (structure shortfalls, biome counts) and simulation
//! milestones (spawns, kills, level-ups) are emitted through `tracing`.
//! Initialization is idempotent so the CLI, the Bevy plugin and tests can all
//! call it.

use std::sync::Once;
use std::time::Instant;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&LogSettings::default());
    }
}

/// Ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Maps a `-v` count from the CLI onto a level. Zero keeps the default.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Subsystems that get their own filter directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    Generation,
    Simulation,
    Combat,
    Loot,
    Quests,
}

impl LogTarget {
    pub const ALL: [LogTarget; 5] = [
        LogTarget::Generation,
        LogTarget::Simulation,
        LogTarget::Combat,
        LogTarget::Loot,
        LogTarget::Quests,
    ];

    pub fn module_path(&self) -> &'static str {
        match self {
            LogTarget::Generation => "roguelike_core::generation",
            LogTarget::Simulation => "roguelike_core::simulation",
            LogTarget::Combat => "roguelike_core::combat",
            LogTarget::Loot => "roguelike_core::loot",
            LogTarget::Quests => "roguelike_core::quests",
        }
    }

    /// Per-tick chatter in loot and quests stays quiet unless asked for.
    fn default_level(&self) -> LogLevel {
        match self {
            LogTarget::Loot | LogTarget::Quests => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    pub baseline: LogLevel,
    pub targets: Vec<(LogTarget, LogLevel)>,
    pub show_targets: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            baseline: LogLevel::Info,
            targets: LogTarget::ALL
                .iter()
                .map(|target| (*target, target.default_level()))
                .collect(),
            show_targets: true,
        }
    }
}

impl LogSettings {
    /// Lowers the baseline and every subsystem that would stay quieter than it.
    pub fn verbose(level: LogLevel) -> Self {
        let mut settings = Self::default();
        settings.baseline = level;
        for (_, target_level) in &mut settings.targets {
            *target_level = (*target_level).min(level);
        }
        settings
    }

    pub fn level_for(&self, target: LogTarget) -> LogLevel {
        self.targets
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, level)| *level)
            .unwrap_or(self.baseline)
    }

    /// `EnvFilter` directive string, e.g. `info,roguelike_core::loot=warn`.
    pub fn directives(&self) -> String {
        std::iter::once(self.baseline.as_str().to_string())
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{}={}", target.module_path(), level.as_str())),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global subscriber. The first call wins; `RUST_LOG` overrides
/// the configured directives.
pub fn init_tracing(settings: &LogSettings) {
    let directives = settings.directives();
    let show_targets = settings.show_targets;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact();

        // The host may already own the global subscriber.
        let _ = subscriber.try_init();
    });
}

/// Enters a span for one pipeline phase and logs its wall time when dropped.
pub struct PhaseTimer {
    phase: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl PhaseTimer {
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            started: Instant::now(),
            _span: tracing::info_span!("phase", name = phase).entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        tracing::debug!(phase = self.phase, elapsed_ms = self.elapsed_ms(), "phase finished");
    }
}
