use std::fmt;

use crate::error::ClientError;

/// Number of acquisition channels on the instrument.
pub const CHANNEL_COUNT: u8 = 6;

/// A validated instrument acquisition channel.
///
/// This is the physical detector channel on the chromatograph (1..=6), not a
/// software pipe. Commands that address a channel take this type so an
/// out-of-range number is rejected before anything reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrumentChannel(u8);

impl InstrumentChannel {
    /// Validate and construct a channel number.
    pub fn new(channel: u8) -> crate::error::Result<Self> {
        Self::try_from(channel)
    }

    /// The channel number, in 1..=6.
    pub fn get(self) -> u8 {
        self.0
    }

    /// All channels in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=CHANNEL_COUNT).map(Self)
    }
}

impl TryFrom<u8> for InstrumentChannel {
    type Error = ClientError;

    fn try_from(channel: u8) -> std::result::Result<Self, Self::Error> {
        if (1..=CHANNEL_COUNT).contains(&channel) {
            Ok(Self(channel))
        } else {
            Err(ClientError::InvalidChannel(channel))
        }
    }
}

impl From<InstrumentChannel> for u8 {
    fn from(channel: InstrumentChannel) -> u8 {
        channel.0
    }
}

impl fmt::Display for InstrumentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_one_through_six() {
        for n in 1..=6u8 {
            assert_eq!(InstrumentChannel::new(n).unwrap().get(), n);
        }
    }

    #[test]
    fn rejects_zero_and_seven() {
        assert!(matches!(
            InstrumentChannel::new(0),
            Err(ClientError::InvalidChannel(0))
        ));
        assert!(matches!(
            InstrumentChannel::new(7),
            Err(ClientError::InvalidChannel(7))
        ));
    }

    #[test]
    fn all_yields_six_channels() {
        let channels: Vec<u8> = InstrumentChannel::all().map(u8::from).collect();
        assert_eq!(channels, vec![1, 2, 3, 4, 5, 6]);
    }
}
