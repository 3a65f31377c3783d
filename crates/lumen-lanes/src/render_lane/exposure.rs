// Copyright 2025 eraflo
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

//! Temporal adaptation of the measured luminance.

use lumen_core::renderer::exposure_for_luminance;

/// Default adaptation time constant in seconds.
pub const DEFAULT_ADAPTATION_TIME_SECS: f32 = 1.5;

const UNINITIALIZED: f32 = -1.0;

/// Smooths the measured scene luminance across frames with an exponential filter.
///
/// `current = previous + (measured - previous) · (1 - exp(-dt / τ))`. The first
/// measurement is taken as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureFilter {
    previous_mean_luminance: f32,
    adaptation_time: f32,
}

impl Default for ExposureFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ADAPTATION_TIME_SECS)
    }
}

impl ExposureFilter {
    /// Creates an uninitialized filter. A time constant `<= 0` adapts instantly.
    pub fn new(adaptation_time_secs: f32) -> Self {
        Self {
            previous_mean_luminance: UNINITIALIZED,
            adaptation_time: adaptation_time_secs,
        }
    }

    /// The time constant τ in seconds.
    pub fn adaptation_time(&self) -> f32 {
        self.adaptation_time
    }

    /// Changes τ without touching the adapted value.
    pub fn set_adaptation_time(&mut self, seconds: f32) {
        self.adaptation_time = seconds;
    }

    /// Feeds one measurement taken `dt` seconds after the previous one and
    /// returns the adapted luminance.
    pub fn update(&mut self, measured: f32, dt: f32) -> f32 {
        debug_assert!(dt >= 0.0, "negative frame delta {dt}");
        let dt = dt.max(0.0);

        let current = if self.previous_mean_luminance == UNINITIALIZED || self.adaptation_time <= 0.0 {
            measured
        } else {
            let previous = self.previous_mean_luminance;
            let blend = 1.0 - (-dt / self.adaptation_time).exp();
            previous + (measured - previous) * blend
        };
        self.previous_mean_luminance = current;
        current
    }

    /// The adapted luminance, or `None` before the first update.
    pub fn current(&self) -> Option<f32> {
        (self.previous_mean_luminance != UNINITIALIZED).then_some(self.previous_mean_luminance)
    }

    /// Forgets the adapted value; the next update initializes the filter again.
    pub fn reset(&mut self) {
        self.previous_mean_luminance = UNINITIALIZED;
    }

    /// The linear exposure scale for the adapted luminance: `key / max(L, min)`.
    ///
    /// Before the first update the exposure is `1.0`.
    pub fn exposure(&self, key_value: f32, min_luminance: f32) -> f32 {
        self.current()
            .map_or(1.0, |l| exposure_for_luminance(l, key_value, min_luminance))
    }
}
