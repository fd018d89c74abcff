use shared::{
    domain::{TempUnit, TimeScale},
    protocol::ConfigMessage,
};

/// Presentation settings pushed by the config channel.
///
/// These only shape what the view shows and how edits are entered; stored
/// profiles and schedules are never rewritten when they change.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub temp_scale: TempUnit,
    pub time_scale_slope: TimeScale,
    pub time_scale_profile: TimeScale,
    pub kwh_rate: f64,
    pub currency_type: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            temp_scale: TempUnit::Celsius,
            time_scale_slope: TimeScale::Seconds,
            time_scale_profile: TimeScale::Hours,
            kwh_rate: 0.26,
            currency_type: "EUR".into(),
        }
    }
}

impl DisplaySettings {
    pub fn apply(&mut self, message: ConfigMessage) {
        self.temp_scale = message.temp_scale;
        self.time_scale_slope = message.time_scale_slope;
        self.time_scale_profile = message.time_scale_profile;
        self.kwh_rate = message.kwh_rate;
        self.currency_type = message.currency_type;
    }

    /// Temperature above which the hazard indicator lights.
    pub fn hazard_temperature(&self) -> f64 {
        match self.temp_scale {
            TempUnit::Celsius => 1500.0,
            TempUnit::Fahrenheit => 1500.0 * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Starting temperature used when a schedule is turned back into checkpoints
/// and nothing better is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedTemperatures {
    pub celsius: f64,
    pub fahrenheit: f64,
}

impl Default for SeedTemperatures {
    fn default() -> Self {
        Self {
            celsius: 20.0,
            fahrenheit: 65.0,
        }
    }
}

impl SeedTemperatures {
    pub fn for_unit(&self, unit: TempUnit) -> f64 {
        match unit {
            TempUnit::Celsius => self.celsius,
            TempUnit::Fahrenheit => self.fahrenheit,
        }
    }
}

/// Knobs the embedding application chooses once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerOptions {
    pub seeds: SeedTemperatures,
    /// Combined heating element power, used for energy estimates.
    pub element_watts: f64,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            seeds: SeedTemperatures::default(),
            element_watts: 3850.0,
        }
    }
}
