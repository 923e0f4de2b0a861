//! Buffer-driven playback speed control.
//!
//! When the forward buffer runs low the engine is slowed down slightly so
//! downloads can catch up, instead of stalling outright. A dead band around
//! the target keeps the controller from flapping between speeds.

use crate::config::PlaybackConfig;

/// Who decides the playback speed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpeedMode {
    /// Buffer level picks between the low-buffer and normal speeds
    #[default]
    Auto,
    /// User-chosen speed, clamped to the manual band
    Manual(f32),
}

impl SpeedMode {
    /// Short indicator shown in the diagnostics label.
    pub fn indicator(&self) -> char {
        match self {
            SpeedMode::Auto => 'A',
            SpeedMode::Manual(_) => 'D',
        }
    }
}

/// Computes speed changes from buffer health.
#[derive(Debug, Clone)]
pub struct AdaptiveRateController {
    mode: SpeedMode,
    low_buffer_threshold_secs: f64,
    low_buffer_speed: f32,
    normal_speed: f32,
    dead_band: f32,
    manual_min: f32,
    manual_max: f32,
}

impl AdaptiveRateController {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            mode: SpeedMode::Auto,
            low_buffer_threshold_secs: config.low_buffer_threshold_secs,
            low_buffer_speed: config.low_buffer_speed,
            normal_speed: config.normal_speed,
            dead_band: config.speed_dead_band,
            manual_min: config.manual_min_speed,
            manual_max: config.manual_max_speed,
        }
    }

    pub fn mode(&self) -> SpeedMode {
        self.mode
    }

    /// Switches mode. Manual speeds are clamped into the manual band.
    pub fn set_mode(&mut self, mode: SpeedMode) {
        self.mode = match mode {
            SpeedMode::Auto => SpeedMode::Auto,
            SpeedMode::Manual(speed) => SpeedMode::Manual(self.clamp_manual(speed)),
        };
    }

    fn clamp_manual(&self, speed: f32) -> f32 {
        if speed.is_finite() {
            speed.clamp(self.manual_min, self.manual_max)
        } else {
            self.normal_speed
        }
    }

    /// Speed the engine should run at for the given forward buffer.
    pub fn target_speed(&self, buffered_secs: f64) -> f32 {
        match self.mode {
            SpeedMode::Auto if buffered_secs < self.low_buffer_threshold_secs => {
                self.low_buffer_speed
            }
            SpeedMode::Auto => self.normal_speed,
            SpeedMode::Manual(speed) => speed,
        }
    }

    /// Returns the new speed to apply, or `None` when the current speed is
    /// already within the dead band of the target.
    pub fn evaluate(&self, buffered_secs: f64, current_speed: f32) -> Option<f32> {
        let target = self.target_speed(buffered_secs);
        if (current_speed - target).abs() > self.dead_band {
            Some(target)
        } else {
            None
        }
    }

    /// Diagnostics label, e.g. `  2.50 Mbps |   7.25 s | A`.
    pub fn label(&self, bits_per_second: f64, buffered_secs: f64) -> String {
        format!(
            "{:6.2} Mbps | {:6.2} s | {}",
            bits_per_second / 1_000_000.0,
            buffered_secs,
            self.mode.indicator()
        )
    }
}
