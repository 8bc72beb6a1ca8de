//! Game time: fixed engine ticks scaled into game-seconds.
//!
//! The engine ticks at a fixed 60 Hz; `game_speed` scales each tick into
//! game-seconds, which is the unit every field accumulator counts in. The
//! world clock (`time_of_day`, `day_number`) derives from `day_length`,
//! the number of game-seconds in a full day.

use serde::{Deserialize, Serialize};

/// Fixed engine timestep in real seconds. Determinism depends on this never
/// varying between runs.
pub const TICK_DT: f32 = 1.0 / 60.0;

/// The world clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    /// Multiplier: 1.0 = real-time, 0 = paused.
    pub game_speed: f32,
    /// Total elapsed game-seconds. f64 for precision over long sessions.
    pub game_time: f64,
    /// Game-seconds elapsed this tick.
    pub game_delta: f32,
    /// 0.0..24.0 hours.
    pub time_of_day: f32,
    /// Current day, starting at 1.
    pub day_number: u32,
    /// Game-seconds per full day.
    pub day_length: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            game_speed: 1.0,
            game_time: 0.0,
            game_delta: TICK_DT,
            time_of_day: 6.0,
            day_number: 1,
            day_length: 60.0,
        }
    }
}

impl GameClock {
    /// Advance by one engine tick. Returns false while paused
    /// (`game_speed <= 0`), in which case no game time passes.
    pub fn update(&mut self, tick_dt: f32) -> bool {
        if self.game_speed <= 0.0 {
            self.game_delta = 0.0;
            return false;
        }

        self.game_delta = tick_dt * self.game_speed;
        self.game_time += f64::from(self.game_delta);

        if self.day_length > 0.0 {
            self.time_of_day += (self.game_delta / self.day_length) * 24.0;
            while self.time_of_day >= 24.0 {
                self.time_of_day -= 24.0;
                self.day_number += 1;
            }
        }

        true
    }

    /// Convert game-hours into game-seconds at the current day length.
    #[inline]
    #[must_use]
    pub fn game_hours_to_seconds(&self, hours: f32) -> f32 {
        hours * (self.day_length / 24.0)
    }

    /// Convert a per-game-hour rate into a per-game-second rate.
    #[inline]
    #[must_use]
    pub fn rate_per_game_second(&self, rate_per_hour: f32) -> f32 {
        rate_per_hour * 24.0 / self.day_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn paused_clock_passes_no_time() {
        let mut clock = GameClock::default();
        clock.game_speed = 0.0;
        assert!(!clock.update(TICK_DT));
        assert_eq!(clock.game_delta, 0.0);
        assert_eq!(clock.game_time, 0.0);
    }

    #[test]
    fn game_speed_scales_delta() {
        let mut clock = GameClock::default();
        clock.game_speed = 10.0;
        assert!(clock.update(TICK_DT));
        assert_relative_eq!(clock.game_delta, TICK_DT * 10.0);
    }

    #[test]
    fn day_rolls_over_at_midnight() {
        let mut clock = GameClock::default();
        clock.day_length = 24.0; // one game-second per hour
        clock.time_of_day = 23.5;
        clock.game_speed = 60.0; // one game-second per tick
        clock.update(TICK_DT);
        assert_eq!(clock.day_number, 2);
        assert!(clock.time_of_day < 24.0);
    }

    #[test]
    fn hour_conversion_matches_day_length() {
        let clock = GameClock::default();
        assert_relative_eq!(clock.game_hours_to_seconds(24.0), clock.day_length);
        assert_relative_eq!(clock.game_hours_to_seconds(1.0), 60.0 / 24.0);
        assert_relative_eq!(clock.rate_per_game_second(clock.day_length / 24.0), 1.0);
    }

    #[test]
    fn long_run_accumulates_days() {
        let mut clock = GameClock::default();
        clock.game_speed = 60.0;
        for _ in 0..(2 * 60) {
            clock.update(TICK_DT);
        }
        // 120 game-seconds at day_length 60 = two full days
        assert_eq!(clock.day_number, 3);
        assert_relative_eq!(clock.time_of_day, 6.0, epsilon = 1e-3);
    }
}
