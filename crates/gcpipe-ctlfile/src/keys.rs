//! Well-known control-file keys.
//!
//! Key strings match what the instrument software writes; channels are
//! interpolated by number. Callers validate the channel range first.

/// Directory the instrument software saves run output under.
pub const DATA_FILE_PATH: &str = "DATA FILE PATH";

/// Run time for a channel, in milliseconds.
pub fn channel_time(channel: u8) -> String {
    format!("CHANNEL {channel} TIME")
}

/// Whether the channel cycles automatically after a run (0/1).
pub fn channel_postrun_cycle(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN CYCLE")
}

/// Delay between cycled runs, in milliseconds.
pub fn channel_postrun_cycle_time(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN CYCLE TIME")
}

/// How many cycled runs to perform.
pub fn channel_postrun_repeat(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN REPEAT")
}

/// Detector label for the channel's output files (e.g. FID, TCD).
pub fn channel_file(channel: u8) -> String {
    format!("CHANNEL {channel} FILE")
}

/// Save raw data after each cycled run (0/1).
pub fn channel_postrun_save_data(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN SAVE DATA")
}

/// Save integration results after each cycled run (0/1).
pub fn channel_postrun_save_results(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN SAVE RESULTS")
}

/// Save the chromatogram image after each cycled run (0/1).
pub fn channel_postrun_save_image(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN SAVE IMAGE")
}

/// Auto-increment output file names between cycled runs (0/1).
pub fn channel_postrun_autoincrement(channel: u8) -> String {
    format!("CHANNEL {channel} POSTRUN AUTOINCREMENT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_keys_interpolate() {
        assert_eq!(channel_time(1), "CHANNEL 1 TIME");
        assert_eq!(channel_postrun_cycle_time(3), "CHANNEL 3 POSTRUN CYCLE TIME");
        assert_eq!(channel_file(2), "CHANNEL 2 FILE");
        assert_eq!(
            channel_postrun_autoincrement(6),
            "CHANNEL 6 POSTRUN AUTOINCREMENT"
        );
    }
}
