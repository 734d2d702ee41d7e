//! Static configuration bundle of the simulation.
//!
//! Defaults reproduce a Meshtastic node on the US band running the
//! LongFast modem preset.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{SimError, SimResult};
use super::types::Role;

/// Largest hop limit a message may start with.
pub const MAX_HOP_LIMIT: u8 = 7;

/// One row of the modem profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModemProfile {
    pub name: String,
    pub spreading_factor: u8,
    /// Channel bandwidth in Hz.
    pub bandwidth: u32,
    /// 1..=4, representing 4/5 to 4/8.
    pub coding_rate: u8,
    /// Minimum RSSI (dBm) at which the profile demodulates.
    pub sensitivity: f64,
}

impl ModemProfile {
    pub fn new(name: &str, spreading_factor: u8, bandwidth: u32, coding_rate: u8, sensitivity: f64) -> Self {
        Self {
            name: name.to_string(),
            spreading_factor,
            bandwidth,
            coding_rate,
            sensitivity,
        }
    }
}

/// The Meshtastic modem presets, fastest first.
pub fn default_modem_profiles() -> Vec<ModemProfile> {
    vec![
        ModemProfile::new("ShortFast", 7, 250_000, 1, -121.5),
        ModemProfile::new("ShortSlow", 8, 250_000, 1, -124.0),
        ModemProfile::new("MediumFast", 9, 250_000, 1, -126.5),
        ModemProfile::new("MediumSlow", 10, 250_000, 1, -129.0),
        ModemProfile::new("LongFast", 11, 250_000, 1, -131.5),
        ModemProfile::new("LongModerate", 11, 125_000, 4, -133.5),
        ModemProfile::new("LongSlow", 12, 125_000, 4, -136.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub modem_profiles: Vec<ModemProfile>,
    /// Name of the active row in `modem_profiles`.
    pub modem: String,
    /// Default transmit power (dBm) of placed nodes.
    pub tx_power: f64,
    /// Default antenna gain (dB) of placed nodes.
    pub antenna_gain: f64,
    /// Carrier frequency (Hz).
    pub frequency: f64,
    /// Receiver noise floor (dBm).
    pub noise_floor: f64,
    /// Protocol header bytes added to every payload.
    pub header_length: u32,
    /// Application payload bytes per packet.
    pub payload_length: u32,
    pub preamble_symbols: u32,
    pub default_hop_limit: u8,
    pub default_role: Role,
    /// Default antenna height (m) of placed nodes.
    pub default_height: f64,
    /// How long (ms) a finished packet stays eligible for collision checks.
    pub in_flight_window_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            modem_profiles: default_modem_profiles(),
            modem: "LongFast".to_string(),
            tx_power: 30.0,
            antenna_gain: 0.0,
            frequency: 915e6,
            noise_floor: -119.25,
            header_length: 16,
            payload_length: 40,
            preamble_symbols: 16,
            default_hop_limit: 3,
            default_role: Role::Client,
            default_height: 1.0,
            in_flight_window_ms: 60_000,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path).with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let config: SimConfig = toml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// The active modem profile.
    pub fn active_modem(&self) -> SimResult<&ModemProfile> {
        self.modem_profiles
            .iter()
            .find(|p| p.name == self.modem)
            .ok_or_else(|| SimError::InvalidConfig(format!("unknown modem profile '{}'", self.modem)))
    }

    /// Reject parameters the physical model cannot work with.
    ///
    /// The hop limit bound is what keeps relay trees finite; nothing else in
    /// the router guards against runaway rebroadcasts.
    pub fn validate(&self) -> SimResult<()> {
        for profile in &self.modem_profiles {
            if !(6..=12).contains(&profile.spreading_factor) {
                return Err(SimError::InvalidConfig(format!(
                    "modem '{}': spreading_factor {} must be 6-12",
                    profile.name, profile.spreading_factor
                )));
            }
            if profile.bandwidth == 0 {
                return Err(SimError::InvalidConfig(format!("modem '{}': bandwidth must be positive", profile.name)));
            }
            if !(1..=4).contains(&profile.coding_rate) {
                return Err(SimError::InvalidConfig(format!(
                    "modem '{}': coding_rate {} must be 1-4 (representing 4/5 to 4/8)",
                    profile.name, profile.coding_rate
                )));
            }
            if !profile.sensitivity.is_finite() {
                return Err(SimError::InvalidConfig(format!("modem '{}': sensitivity must be finite", profile.name)));
            }
        }
        self.active_modem()?;

        validate_hop_limit(self.default_hop_limit)?;
        if !is_positive(self.frequency) {
            return Err(SimError::InvalidConfig("frequency must be positive".to_string()));
        }
        if !is_positive(self.default_height) {
            return Err(SimError::InvalidConfig("default_height must be positive".to_string()));
        }
        for (name, value) in [("tx_power", self.tx_power), ("antenna_gain", self.antenna_gain), ("noise_floor", self.noise_floor)] {
            if !value.is_finite() {
                return Err(SimError::InvalidConfig(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.preamble_symbols < 6 {
            return Err(SimError::InvalidConfig(format!("preamble_symbols {} must be at least 6", self.preamble_symbols)));
        }
        Ok(())
    }
}

/// False for NaN and infinities as well as for non-positive values.
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub(crate) fn validate_hop_limit(hop_limit: u8) -> SimResult<()> {
    if hop_limit == 0 || hop_limit > MAX_HOP_LIMIT {
        return Err(SimError::InvalidConfig(format!("hop limit {} must be 1-{}", hop_limit, MAX_HOP_LIMIT)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_long_fast() {
        let config = SimConfig::default();
        config.validate().unwrap();
        let modem = config.active_modem().unwrap();
        assert_eq!(modem.spreading_factor, 11);
        assert_eq!(modem.bandwidth, 250_000);
        assert_eq!(modem.sensitivity, -131.5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            modem = "LongSlow"
            tx_power = 20.0
            default_role = "Router"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.active_modem().unwrap().spreading_factor, 12);
        assert_eq!(config.tx_power, 20.0);
        assert_eq!(config.default_role, Role::Router);
        assert_eq!(config.default_hop_limit, 3);
    }

    #[test]
    fn custom_profile_table_from_toml() {
        let config: SimConfig = toml::from_str(
            r#"
            modem = "Lab"

            [[modem_profiles]]
            name = "Lab"
            spreading_factor = 9
            bandwidth = 500000
            coding_rate = 2
            sensitivity = -117.0
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.modem_profiles.len(), 1);
        assert_eq!(config.active_modem().unwrap().bandwidth, 500_000);
    }

    #[test]
    fn unknown_modem_is_rejected() {
        let config = SimConfig {
            modem: "Turbo".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn hop_limit_must_be_small_and_positive() {
        for hop_limit in [0, MAX_HOP_LIMIT + 1] {
            let config = SimConfig {
                default_hop_limit: hop_limit,
                ..SimConfig::default()
            };
            assert!(config.validate().is_err(), "hop limit {hop_limit}");
        }
    }

    #[test]
    fn bad_coding_rate_is_rejected() {
        let mut config = SimConfig::default();
        config.modem_profiles[0].coding_rate = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_and_infinite_parameters_are_rejected() {
        for toml_text in [
            "frequency = nan",
            "frequency = inf",
            "default_height = nan",
            "tx_power = nan",
            "antenna_gain = -inf",
            "noise_floor = nan",
        ] {
            let config: SimConfig = toml::from_str(toml_text).unwrap();
            assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))), "{toml_text}");
        }

        let mut config = SimConfig::default();
        config.modem_profiles[4].sensitivity = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_reads_scene_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenes/config.toml");
        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.modem, "LongFast");
        assert_eq!(config.default_hop_limit, 3);
    }
}
