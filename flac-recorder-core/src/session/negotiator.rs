use crate::models::error::RecorderError;
use crate::models::format::{ChannelPair, ChannelSelection, FrameFormat};
use crate::traits::capture_backend::CaptureBackend;

/// Sample rates tried, in order of preference.
pub const SAMPLE_RATES: [u32; 2] = [48000, 44100];

/// Bit depths tried for each rate, in order of preference.
pub const BIT_DEPTHS: [u16; 3] = [32, 24, 16];

/// Find a format the hardware accepts for the requested channel pair.
///
/// With no `channel_count` the first channel map wide enough for the pair
/// wins. The probe is always ended before returning, on success or failure.
pub fn negotiate<B: CaptureBackend>(
    backend: &mut B,
    channels: ChannelPair,
    channel_count: Option<u16>,
) -> Result<(FrameFormat, ChannelSelection), RecorderError> {
    let result = probe(backend, channels, channel_count);
    backend.end_probe();
    result
}

fn probe<B: CaptureBackend>(
    backend: &mut B,
    channels: ChannelPair,
    channel_count: Option<u16>,
) -> Result<(FrameFormat, ChannelSelection), RecorderError> {
    let channel_count = match channel_count {
        Some(count) => count,
        None => detect_channel_count(backend, channels)?,
    };
    let selection = ChannelSelection::new(channels, channel_count)?;

    for rate in SAMPLE_RATES {
        for bits in BIT_DEPTHS {
            let format = FrameFormat::new(rate, bits, channel_count);
            match backend.try_format(&format) {
                Ok(()) => {
                    log::info!("Using {} on {}", format, backend.interface());
                    return Ok((format, selection));
                }
                Err(e) => log::debug!("{} rejected {}: {}", backend.interface(), format, e),
            }
        }
    }

    Err(RecorderError::Configuration(format!(
        "no supported sample format on {} ({} channels)",
        backend.interface(),
        channel_count
    )))
}

fn detect_channel_count<B: CaptureBackend>(
    backend: &mut B,
    channels: ChannelPair,
) -> Result<u16, RecorderError> {
    let counts = backend.channel_counts()?;
    log::debug!("{} channel maps: {:?}", backend.interface(), counts);

    counts
        .into_iter()
        .find(|&count| count > channels.max())
        .ok_or_else(|| {
            RecorderError::Configuration(format!(
                "cannot determine channel count of {} for channels {}",
                backend.interface(),
                channels
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    #[test]
    fn picks_first_map_wide_enough() {
        let mut backend = ScriptedBackend::new().with_channel_maps(vec![2, 6, 10]);
        let (format, selection) = negotiate(&mut backend, ChannelPair::new(8, 9), None).unwrap();

        assert_eq!(format.channel_count, 10);
        assert_eq!(selection.indices(), [8, 9]);
        assert_eq!(backend.probe_ended(), 1);
    }

    #[test]
    fn map_must_strictly_exceed_highest_index() {
        let mut backend = ScriptedBackend::new().with_channel_maps(vec![2, 4, 8]);
        let (format, _) = negotiate(&mut backend, ChannelPair::new(0, 4), None).unwrap();
        assert_eq!(format.channel_count, 8);
    }

    #[test]
    fn no_wide_enough_map() {
        let mut backend = ScriptedBackend::new().with_channel_maps(vec![2, 6]);
        let err = negotiate(&mut backend, ChannelPair::new(8, 9), None).unwrap_err();

        match err {
            RecorderError::Configuration(msg) => assert!(msg.contains("cannot determine channel count")),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(backend.format_attempts().is_empty());
        assert_eq!(backend.probe_ended(), 1);
    }

    #[test]
    fn falls_back_through_rates_and_depths() {
        let mut backend = ScriptedBackend::new().accepting(&[(44100, 24)]);
        let (format, _) = negotiate(&mut backend, ChannelPair::new(0, 1), Some(2)).unwrap();

        assert_eq!(format, FrameFormat::new(44100, 24, 2));
        assert_eq!(
            backend.format_attempts(),
            vec![(48000, 32), (48000, 24), (48000, 16), (44100, 32), (44100, 24)]
        );
    }

    #[test]
    fn prefers_highest_rate_and_depth() {
        let mut backend = ScriptedBackend::new().accepting(&[(44100, 16), (48000, 24), (48000, 32)]);
        let (format, _) = negotiate(&mut backend, ChannelPair::new(0, 1), Some(4)).unwrap();
        assert_eq!(format, FrameFormat::new(48000, 32, 4));
    }

    #[test]
    fn explicit_count_skips_channel_maps() {
        let mut backend = ScriptedBackend::new().with_channel_maps(vec![2]);
        let (format, _) = negotiate(&mut backend, ChannelPair::new(8, 9), Some(12)).unwrap();
        assert_eq!(format.channel_count, 12);
    }

    #[test]
    fn explicit_count_too_small_for_selection() {
        let mut backend = ScriptedBackend::new();
        let err = negotiate(&mut backend, ChannelPair::new(0, 2), Some(2)).unwrap_err();
        assert!(matches!(err, RecorderError::Configuration(_)));
        assert!(backend.format_attempts().is_empty());
    }

    #[test]
    fn exhaustion_names_the_device() {
        let mut backend = ScriptedBackend::new().named("hw:7").accepting(&[]);
        let err = negotiate(&mut backend, ChannelPair::new(0, 1), Some(2)).unwrap_err();

        match err {
            RecorderError::Configuration(msg) => assert!(msg.contains("hw:7")),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(backend.format_attempts().len(), 6);
        assert_eq!(backend.probe_ended(), 1);
    }
}
