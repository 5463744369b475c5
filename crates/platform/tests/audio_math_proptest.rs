//! Property-based tests for audio domain math.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

use platform::audio_types::{Amplitude, SampleRateHz, VolumePercent};

proptest::proptest! {
    /// VolumePercent::new never panics for any u8 input (clamps to 100).
    #[test]
    fn volume_percent_new_never_panics(pct in 0u8..=255u8) {
        let v = VolumePercent::new(pct);
        assert!(v.get() <= 100);
    }

    /// Higher volume → higher or equal amplitude.
    #[test]
    fn amplitude_is_monotone_in_volume(a in 0u8..=100u8, b in 0u8..=100u8) {
        let aa = Amplitude::from_volume(VolumePercent::new(a));
        let ab = Amplitude::from_volume(VolumePercent::new(b));
        if a >= b {
            assert!(aa.get() >= ab.get(),
                "volume {} → {} should be >= volume {} → {}", a, aa.get(), b, ab.get());
        }
    }

    /// Amplitude never exceeds the positive i16 range.
    #[test]
    fn amplitude_new_stays_in_i16(raw in 0u16..=u16::MAX) {
        assert!(Amplitude::new(raw).get() <= 32_767);
    }

    /// volume → amplitude → volume loses at most one percent.
    #[test]
    fn amplitude_volume_round_trip_within_one(pct in 0u8..=100u8) {
        let back = Amplitude::from_volume(VolumePercent::new(pct)).to_volume().get();
        assert!(pct - back <= 1, "{} came back as {}", pct, back);
    }

    /// SampleRateHz::new never panics for any u32 input.
    #[test]
    fn sample_rate_hz_new_never_panics(hz in 0u32..=u32::MAX) {
        let _ = SampleRateHz::new(hz);
    }

    /// SampleRateHz valid range [8000, 48000] always succeeds.
    #[test]
    fn sample_rate_hz_valid_range_always_ok(hz in 8000u32..=48_000u32) {
        assert!(SampleRateHz::new(hz).is_ok());
    }

    /// SampleRateHz out of range always fails.
    #[test]
    fn sample_rate_hz_out_of_range_always_err(hz in 48_001u32..=u32::MAX) {
        assert!(SampleRateHz::new(hz).is_err());
    }
}
