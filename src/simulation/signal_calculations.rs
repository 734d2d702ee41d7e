//! Radio signal and timing calculations (the link-budget model).
//!
//! Contains helpers for:
//! - 3GPP Suburban-Macro path loss
//! - RSSI, SNR and the sensitivity test deciding reception
//! - LoRa time-on-air and symbol time
//! - Maximum range estimation given a simple link budget
//!
//! Units:
//! - Power: dBm, gains and losses in dB
//! - Frequency and bandwidth: Hz
//! - Time: milliseconds on the logical clock
//! - Distance and heights: meters
//!
//! All functions are deterministic; no fading term is sampled.

use super::geometry::MIN_DISTANCE;

/// Upper bound for [`estimate_max_range`], in meters.
pub const MAX_RANGE_SEARCH_LIMIT: f64 = 10_000.0;

/// Calculate the path loss (in dB) using the 3GPP Suburban-Macro model.
///
/// # Formula
///
/// ```text
/// PL = (44.9 − 6.55·log10(h_tx))·(log10(d) − 3.0) + 45.5
///    + (35.46 − 1.1·h_rx)·(log10(f) − 6.0) − 13.82·log10(h_rx) + 0.7·h_rx
/// ```
///
/// # Parameters
///
/// - `distance`: transmitter to receiver distance in meters
/// - `frequency`: carrier frequency in Hz
/// - `tx_height`, `rx_height`: antenna heights in meters
///
/// # Notes
///
/// Distances below [`MIN_DISTANCE`] are clamped so the logarithm stays finite.
pub fn calculate_path_loss(distance: f64, frequency: f64, tx_height: f64, rx_height: f64) -> f64 {
    let distance = distance.max(MIN_DISTANCE);
    (44.9 - 6.55 * tx_height.log10()) * (distance.log10() - 3.0) + 45.5 + (35.46 - 1.1 * rx_height) * (frequency.log10() - 6.0)
        - 13.82 * rx_height.log10()
        + 0.7 * rx_height
}

/// Received signal strength (dBm): `P_tx + G_tx − PL`.
pub fn calculate_rssi(tx_power_dbm: f64, tx_antenna_gain: f64, path_loss: f64) -> f64 {
    tx_power_dbm + tx_antenna_gain - path_loss
}

/// Signal to noise ratio (dB) against a fixed noise floor.
pub fn calculate_snr(rssi: f64, noise_floor: f64) -> f64 {
    rssi - noise_floor
}

/// Whether a signal at `rssi` can be demodulated. A signal exactly at the
/// sensitivity limit is received.
pub fn can_receive(rssi: f64, sensitivity: f64) -> bool {
    rssi >= sensitivity
}

/// LoRa symbol time in milliseconds: `2^SF / BW`.
pub fn symbol_time_ms(spreading_factor: u8, bandwidth: u32) -> f64 {
    2.0_f64.powi(spreading_factor as i32) / bandwidth as f64 * 1000.0
}

/// Time on air of one packet in whole milliseconds (rounded down).
///
/// Standard SX127x payload symbol count, CRC always enabled:
///
/// ```text
/// T_sym      = 2^SF / BW
/// T_preamble = (N_preamble + 4.25) · T_sym
/// N_payload  = 8 + max(ceil((8·PL − 4·SF + 28 + 16 − 20·IH) / (4·(SF − 2·DE))) · (CR + 4), 0)
/// ```
///
/// - `PL` is `payload_length + header_length` bytes
/// - `DE` (low data rate optimization) is set for 125 kHz at SF11 and SF12
/// - `IH` (implicit header) is set at SF6
/// - `coding_rate` is 1..=4 for 4/5..4/8
pub fn calculate_air_time(payload_length: u32, spreading_factor: u8, bandwidth: u32, coding_rate: u8, preamble_symbols: u32, header_length: u32) -> u64 {
    let sf = spreading_factor as f64;
    let pl = (payload_length + header_length) as f64;
    let de = if bandwidth == 125_000 && matches!(spreading_factor, 11 | 12) { 1.0 } else { 0.0 };
    let ih = if spreading_factor == 6 { 1.0 } else { 0.0 };
    let cr = coding_rate as f64;

    let symbol_time = 2.0_f64.powi(spreading_factor as i32) / bandwidth as f64;
    let preamble_time = (preamble_symbols as f64 + 4.25) * symbol_time;

    let numerator = 8.0 * pl - 4.0 * sf + 28.0 + 16.0 - 20.0 * ih;
    let denom = 4.0 * (sf - 2.0 * de);
    let payload_symbols = 8.0 + ((numerator / denom).ceil() * (cr + 4.0)).max(0.0);

    ((preamble_time + payload_symbols * symbol_time) * 1000.0) as u64
}

/// Estimate how far a transmitter reaches with the given link budget.
///
/// Steps a trial distance from 1 m in 1 m increments while the path loss is
/// still below `tx_power + antenna_gain − sensitivity`, stopping at
/// [`MAX_RANGE_SEARCH_LIMIT`]. Only meant for display; reception decisions
/// always go through [`can_receive`].
pub fn estimate_max_range(tx_power_dbm: f64, antenna_gain: f64, sensitivity: f64, frequency: f64, tx_height: f64, rx_height: f64) -> f64 {
    let max_path_loss = tx_power_dbm + antenna_gain - sensitivity;
    let mut distance = 1.0;
    while calculate_path_loss(distance, frequency, tx_height, rx_height) < max_path_loss && distance < MAX_RANGE_SEARCH_LIMIT {
        distance += 1.0;
    }
    distance
}
