//! Weather and seasons: the ambient-climate signal every field consumes.
//!
//! The driver owns the current weather kind, its intensity, and the wind
//! vector; derives the ambient temperature curve from the clock; and, once
//! per tick, applies weather side effects to the world (rain water, snow
//! accumulation and melt, lightning strikes).

use crate::config::SimConfig;
use crate::simulation::SimulationWorld;
use crate::time::GameClock;
use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The four seasons, in year order starting from spring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Season for a 1-based day number.
    #[must_use]
    pub fn for_day(day_number: u32, days_per_season: u32) -> Self {
        let per = days_per_season.max(1);
        match ((day_number.saturating_sub(1)) / per) % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

/// Current weather type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Rain,
    HeavyRain,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
}

impl WeatherKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear skies",
            WeatherKind::Cloudy => "clouds",
            WeatherKind::Rain => "rain",
            WeatherKind::HeavyRain => "heavy rain",
            WeatherKind::Thunderstorm => "a thunderstorm",
            WeatherKind::Snow => "snow",
            WeatherKind::Mist => "mist",
            WeatherKind::Fog => "fog",
        }
    }

    /// Any kind that drops water on the map.
    #[must_use]
    pub fn is_raining(self) -> bool {
        matches!(self, WeatherKind::Rain | WeatherKind::HeavyRain | WeatherKind::Thunderstorm)
    }
}

// Transition weights per season: [Clear, Cloudy, Rain, HeavyRain,
// Thunderstorm, Snow, Mist, Fog].
const TRANSITIONS: [[u32; 8]; 4] = [
    [30, 25, 20, 10, 5, 0, 5, 5],  // spring
    [40, 20, 10, 5, 15, 0, 5, 5],  // summer
    [25, 25, 20, 10, 5, 0, 5, 10], // autumn
    [25, 25, 5, 0, 0, 25, 10, 10], // winter
];

const KINDS: [WeatherKind; 8] = [
    WeatherKind::Clear,
    WeatherKind::Cloudy,
    WeatherKind::Rain,
    WeatherKind::HeavyRain,
    WeatherKind::Thunderstorm,
    WeatherKind::Snow,
    WeatherKind::Mist,
    WeatherKind::Fog,
];

/// Live weather state. Tests may poke the public fields directly and park
/// `transition_timer` high to hold a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSystem {
    pub current: WeatherKind,
    /// 0..1, ramps smoothly toward `target_intensity`.
    pub intensity: f32,
    pub target_intensity: f32,
    /// Unit direction the wind blows toward.
    pub wind_dir: Vector2<f32>,
    /// 0..1 wind strength.
    pub wind_strength: f32,
    target_wind_strength: f32,
    target_wind_angle: f32,
    /// Game-seconds until the next transition roll.
    pub transition_timer: f32,
    // Side-effect accumulators (game-seconds)
    pub(crate) rain_accum: f32,
    pub(crate) snow_accum: f32,
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self {
            current: WeatherKind::Clear,
            intensity: 0.0,
            target_intensity: 0.0,
            wind_dir: Vector2::new(1.0, 0.0),
            wind_strength: 0.2,
            target_wind_strength: 0.2,
            target_wind_angle: 0.0,
            transition_timer: 30.0,
            rain_accum: 0.0,
            snow_accum: 0.0,
        }
    }
}

impl WeatherSystem {
    /// Dot product of the wind direction with a neighbor offset; positive
    /// means the offset points downwind.
    #[inline]
    #[must_use]
    pub fn wind_dot(&self, dx: i32, dy: i32) -> f32 {
        self.wind_dir.x * dx as f32 + self.wind_dir.y * dy as f32
    }

    /// Hold the given weather at full intensity and stop auto-transitions.
    /// Test hook; production code lets the timer run.
    pub fn force(&mut self, kind: WeatherKind, intensity: f32) {
        self.current = kind;
        self.intensity = intensity;
        self.target_intensity = intensity;
        self.transition_timer = 1.0e9;
    }

    /// Advance the state machine by one tick.
    pub(crate) fn update_state(
        &mut self,
        clock: &GameClock,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) -> Option<WeatherKind> {
        let dt = clock.game_delta;
        let mut changed = None;

        self.transition_timer -= dt;
        if self.transition_timer <= 0.0 {
            let season = Season::for_day(clock.day_number, config.days_per_season);
            let next = pick_transition(season, rng);
            if next != self.current {
                debug!(from = self.current.name(), to = next.name(), "weather transition");
                changed = Some(next);
            }
            self.current = next;
            self.target_intensity = match next {
                WeatherKind::Clear => 0.0,
                WeatherKind::Cloudy | WeatherKind::Mist | WeatherKind::Fog => {
                    rng.random_range(0.3..0.7)
                }
                _ => rng.random_range(0.6..1.0),
            };
            self.target_wind_strength = match next {
                WeatherKind::Thunderstorm => rng.random_range(0.7..1.0),
                WeatherKind::HeavyRain => rng.random_range(0.5..0.9),
                WeatherKind::Rain | WeatherKind::Snow => rng.random_range(0.3..0.7),
                _ => rng.random_range(0.0..0.5),
            };
            self.target_wind_angle = rng.random_range(0.0..std::f32::consts::TAU);
            self.transition_timer =
                clock.game_hours_to_seconds(rng.random_range(0.25..1.5));
        }

        // Intensity ramps smoothly rather than snapping.
        let ramp = 0.2 * dt;
        if (self.intensity - self.target_intensity).abs() <= ramp {
            self.intensity = self.target_intensity;
        } else if self.intensity < self.target_intensity {
            self.intensity += ramp;
        } else {
            self.intensity -= ramp;
        }

        // Wind strength ramps; direction rotates slowly toward the target.
        let wind_ramp = 0.1 * dt;
        if (self.wind_strength - self.target_wind_strength).abs() <= wind_ramp {
            self.wind_strength = self.target_wind_strength;
        } else if self.wind_strength < self.target_wind_strength {
            self.wind_strength += wind_ramp;
        } else {
            self.wind_strength -= wind_ramp;
        }

        let angle = self.wind_dir.y.atan2(self.wind_dir.x);
        let mut diff = self.target_wind_angle - angle;
        while diff > std::f32::consts::PI {
            diff -= std::f32::consts::TAU;
        }
        while diff < -std::f32::consts::PI {
            diff += std::f32::consts::TAU;
        }
        let turn = diff.clamp(-0.05 * dt, 0.05 * dt);
        let new_angle = angle + turn;
        self.wind_dir = Vector2::new(new_angle.cos(), new_angle.sin());

        changed
    }

    /// Weather-driven surface temperature: base plus the seasonal and
    /// diurnal cosine swings.
    #[must_use]
    pub fn ambient_surface_temp(clock: &GameClock, config: &SimConfig) -> f32 {
        let per = config.days_per_season.max(1);
        let days_per_year = (per * 4) as f32;
        let year_day = ((clock.day_number.saturating_sub(1)) % (per * 4)) as f32;
        let year_frac = (year_day + clock.time_of_day / 24.0) / days_per_year;
        // Peak warmth at mid-summer (year fraction 0.375 with spring first).
        let seasonal =
            config.seasonal_amplitude as f32 * (std::f32::consts::TAU * (year_frac - 0.375)).cos();
        // Peak warmth at 14:00.
        let diurnal = config.diurnal_amplitude as f32
            * (std::f32::consts::TAU * (clock.time_of_day - 14.0) / 24.0).cos();
        config.base_surface_temp as f32 + seasonal + diurnal
    }

    /// Vegetation growth rate for the current date: zero through winter,
    /// ramping through spring and autumn, full through summer.
    #[must_use]
    pub fn seasonal_growth_rate(clock: &GameClock, config: &SimConfig) -> f32 {
        let per = config.days_per_season.max(1);
        let day_in_season = ((clock.day_number.saturating_sub(1)) % per) as f32
            + clock.time_of_day / 24.0;
        let frac = (day_in_season / per as f32).clamp(0.0, 1.0);
        match Season::for_day(clock.day_number, config.days_per_season) {
            Season::Spring => frac,
            Season::Summer => 1.0,
            Season::Autumn => 1.0 - frac,
            Season::Winter => 0.0,
        }
    }
}

fn pick_transition(season: Season, rng: &mut impl Rng) -> WeatherKind {
    let weights = &TRANSITIONS[season as usize];
    let total: u32 = weights.iter().sum();
    let mut roll = rng.random_range(0..total);
    for (kind, &w) in KINDS.iter().zip(weights) {
        if roll < w {
            return *kind;
        }
        roll -= w;
    }
    WeatherKind::Clear
}

impl SimulationWorld {
    /// Weather step: advance the state machine, then apply rain, snow and
    /// lightning to the map.
    pub fn update_weather(&mut self) {
        if !self.config.weather_enabled {
            return;
        }

        if let Some(next) = self.weather.update_state(&self.clock, &self.config, &mut self.rng) {
            self.log_event(&format!("The weather turns to {}", next.name()));
        }

        self.apply_rain();
        self.apply_snow();
        self.apply_lightning();
    }

    /// Rain drops level-1 water onto random open-sky columns.
    fn apply_rain(&mut self) {
        if !self.weather.current.is_raining() || self.weather.intensity <= 0.0 {
            self.weather.rain_accum = 0.0;
            return;
        }
        self.weather.rain_accum += self.clock.game_delta;
        if self.weather.rain_accum < self.config.rain_water_interval {
            return;
        }
        self.weather.rain_accum -= self.config.rain_water_interval;

        let columns = (self.grid.width() * self.grid.height()).max(1);
        let mut drops = ((columns / 50).max(1) as f32 * self.weather.intensity).ceil() as i32;
        if self.weather.current == WeatherKind::HeavyRain
            || self.weather.current == WeatherKind::Thunderstorm
        {
            drops *= 2;
        }
        for _ in 0..drops {
            let x = self.rng.random_range(0..self.grid.width());
            let y = self.rng.random_range(0..self.grid.height());
            if let Some(z) = self.open_sky_landing(x, y) {
                self.add_water(x, y, z, 1);
                // Rain on bare soil at least dampens it
                if z > 0 {
                    let below = self.grid.wetness(x, y, z - 1);
                    if below == 0 {
                        self.grid.set_wetness(x, y, z - 1, 1);
                    }
                }
            }
        }
    }

    /// Snow builds on exposed surfaces below freezing and melts into
    /// wetness above freezing.
    fn apply_snow(&mut self) {
        self.weather.snow_accum += self.clock.game_delta;
        if self.weather.snow_accum < self.config.snow_interval {
            return;
        }
        self.weather.snow_accum -= self.config.snow_interval;

        let ambient = self.ambient_temperature(self.config.surface_z);
        let snowing = self.weather.current == WeatherKind::Snow && ambient <= 0;
        let melting = ambient > 0;
        if !snowing && !melting {
            return;
        }

        let columns = (self.grid.width() * self.grid.height()).max(1);
        let passes = (columns / 16).max(1);
        for _ in 0..passes {
            let x = self.rng.random_range(0..self.grid.width());
            let y = self.rng.random_range(0..self.grid.height());
            if snowing {
                if let Some(z) = self.open_sky_landing(x, y) {
                    let level = self.snow.get(x as usize, y as usize, z as usize);
                    if level < crate::core_types::MAX_LEVEL {
                        self.snow.set(x as usize, y as usize, z as usize, level + 1);
                        self.grid.mark_chunk_dirty(x, y, z);
                    }
                }
            } else {
                // Melt the topmost snow in this column
                for z in (0..self.grid.depth()).rev() {
                    let level = self.snow.get(x as usize, y as usize, z as usize);
                    if level > 0 {
                        self.snow.set(x as usize, y as usize, z as usize, level - 1);
                        self.grid.mark_chunk_dirty(x, y, z);
                        if z > 0 {
                            let wet = self.grid.wetness(x, y, z - 1);
                            self.grid.set_wetness(x, y, z - 1, wet + 1);
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Thunderstorms roll a per-tick lightning strike that can start fires.
    fn apply_lightning(&mut self) {
        if self.weather.current != WeatherKind::Thunderstorm {
            return;
        }
        let chance = self.config.lightning_rate * self.weather.intensity * self.clock.game_delta;
        if self.rng.random::<f32>() >= chance {
            return;
        }
        // A handful of attempts to find something strikeable
        for _ in 0..8 {
            let x = self.rng.random_range(0..self.grid.width());
            let y = self.rng.random_range(0..self.grid.height());
            let Some(z) = self.open_sky_landing(x, y) else { continue };
            // The strike hits the landing cell or the surface beneath it
            for cz in [z, z - 1] {
                if self.can_burn(x, y, cz) {
                    self.ignite_cell(x, y, cz);
                    self.log_event(&format!("Lightning strikes at ({x}, {y})"));
                    return;
                }
            }
        }
    }

    /// Lowest open cell in the column that the sky can reach, if any.
    fn open_sky_landing(&self, x: i32, y: i32) -> Option<i32> {
        for z in (0..self.grid.depth()).rev() {
            let kind = self.grid.kind(x, y, z);
            if crate::core_types::cell_blocks_fluids(kind) || crate::core_types::cell_is_solid(kind)
            {
                let above = z + 1;
                return (above < self.grid.depth()).then_some(above);
            }
        }
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_cycle_with_day_number() {
        assert_eq!(Season::for_day(1, 7), Season::Spring);
        assert_eq!(Season::for_day(7, 7), Season::Spring);
        assert_eq!(Season::for_day(8, 7), Season::Summer);
        assert_eq!(Season::for_day(15, 7), Season::Autumn);
        assert_eq!(Season::for_day(22, 7), Season::Winter);
        assert_eq!(Season::for_day(29, 7), Season::Spring);
    }

    fn seasonal_config() -> SimConfig {
        SimConfig {
            base_surface_temp: 15,
            seasonal_amplitude: 20,
            diurnal_amplitude: 5,
            ..SimConfig::default()
        }
    }

    #[test]
    fn ambient_peaks_in_summer_afternoon() {
        let config = seasonal_config();
        let mut clock = GameClock::default();

        clock.day_number = 11; // mid-summer with 7-day seasons
        clock.time_of_day = 14.0;
        let summer = WeatherSystem::ambient_surface_temp(&clock, &config);

        clock.day_number = 25; // mid-winter
        let winter = WeatherSystem::ambient_surface_temp(&clock, &config);

        assert!(summer > winter + 30.0, "summer {summer} vs winter {winter}");
        assert!(summer <= (config.base_surface_temp + config.seasonal_amplitude + config.diurnal_amplitude) as f32 + 0.5);
    }

    #[test]
    fn diurnal_swing_is_warmest_at_fourteen() {
        let config = seasonal_config();
        let mut clock = GameClock::default();
        clock.day_number = 11;
        clock.time_of_day = 14.0;
        let afternoon = WeatherSystem::ambient_surface_temp(&clock, &config);
        clock.time_of_day = 2.0;
        let night = WeatherSystem::ambient_surface_temp(&clock, &config);
        assert!(afternoon > night);
    }

    #[test]
    fn growth_rate_zero_in_winter_full_in_summer() {
        let config = SimConfig::default();
        let mut clock = GameClock::default();
        clock.day_number = 23;
        assert_eq!(WeatherSystem::seasonal_growth_rate(&clock, &config), 0.0);
        clock.day_number = 10;
        assert_eq!(WeatherSystem::seasonal_growth_rate(&clock, &config), 1.0);
    }

    #[test]
    fn wind_dot_points_downwind() {
        let mut weather = WeatherSystem::default();
        weather.wind_dir = Vector2::new(1.0, 0.0);
        assert!(weather.wind_dot(1, 0) > 0.0);
        assert!(weather.wind_dot(-1, 0) < 0.0);
        assert_eq!(weather.wind_dot(0, 1), 0.0);
    }

    #[test]
    fn winter_transitions_never_pick_storms() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let kind = pick_transition(Season::Winter, &mut rng);
            assert!(!matches!(kind, WeatherKind::Thunderstorm | WeatherKind::HeavyRain));
        }
    }
}
