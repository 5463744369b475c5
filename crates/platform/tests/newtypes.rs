//! Type system enforcement tests for audio domain newtypes.
//! These newtypes keep volume and amplitude arithmetic inside the i16 range.

// ── VolumePercent ────────────────────────────────────────────────────────────

#[test]
fn volume_percent_new_clamps_over_100() {
    use platform::audio_types::VolumePercent;
    let v = VolumePercent::new(150);
    assert_eq!(v.get(), 100, "VolumePercent::new(150) should clamp to 100");
}

#[test]
fn volume_percent_new_allows_bounds() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::new(0).get(), 0);
    assert_eq!(VolumePercent::new(100).get(), 100);
}

#[test]
fn volume_percent_try_new_rejects_over_100() {
    use platform::audio_types::VolumePercent;
    assert!(VolumePercent::try_new(101).is_err());
    assert!(VolumePercent::try_new(255).is_err());
}

#[test]
fn volume_percent_try_new_accepts_valid_range() {
    use platform::audio_types::VolumePercent;
    assert!(VolumePercent::try_new(0).is_ok());
    assert!(VolumePercent::try_new(50).is_ok());
    assert!(VolumePercent::try_new(100).is_ok());
}

#[test]
fn volume_percent_is_one_byte() {
    use platform::audio_types::VolumePercent;
    assert_eq!(core::mem::size_of::<VolumePercent>(), 1);
}

#[test]
fn volume_percent_default_is_half() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::default().get(), 50);
}

// ── Amplitude ────────────────────────────────────────────────────────────────

#[test]
fn amplitude_new_clamps_to_i16_max() {
    use platform::audio_types::Amplitude;
    assert_eq!(Amplitude::new(40_000).get(), 32_767);
    assert_eq!(Amplitude::new(15_000).get(), 15_000);
}

#[test]
fn amplitude_from_volume_is_linear() {
    use platform::audio_types::{Amplitude, VolumePercent};
    assert_eq!(Amplitude::from_volume(VolumePercent::new(0)).get(), 0);
    assert_eq!(Amplitude::from_volume(VolumePercent::new(50)).get(), 16_383);
    assert_eq!(Amplitude::from_volume(VolumePercent::new(100)).get(), 32_767);
}

#[test]
fn amplitude_to_volume_rounds_down() {
    use platform::audio_types::Amplitude;
    // 15000 / 32767 = 45.7 %
    assert_eq!(Amplitude::new(15_000).to_volume().get(), 45);
    assert_eq!(Amplitude::MAX.to_volume().get(), 100);
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

#[test]
fn sample_rate_hz_rejects_zero() {
    use platform::audio_types::SampleRateHz;
    assert!(SampleRateHz::new(0).is_err());
}

#[test]
fn sample_rate_hz_rejects_below_minimum() {
    use platform::audio_types::SampleRateHz;
    assert!(SampleRateHz::new(7_999).is_err());
}

#[test]
fn sample_rate_hz_accepts_speaker_rates() {
    use platform::audio_types::SampleRateHz;
    for hz in [8_000, 16_000, 22_050, 44_100, 48_000] {
        assert!(SampleRateHz::new(hz).is_ok(), "{hz} Hz should be accepted");
    }
}

#[test]
fn sample_rate_hz_rejects_above_maximum() {
    use platform::audio_types::SampleRateHz;
    let err = SampleRateHz::new(96_000).unwrap_err();
    assert_eq!(err.value, 96_000);
    assert_eq!(err.max, 48_000);
}

#[test]
fn sample_rate_hz_get_returns_value() {
    use platform::audio_types::SampleRateHz;
    assert_eq!(SampleRateHz::new(16_000).unwrap().get(), 16_000);
}

// ── SourceFormat ─────────────────────────────────────────────────────────────

#[test]
fn source_format_frame_bytes() {
    use platform::audio::SourceFormat;
    let i2s_stereo = SourceFormat {
        sample_rate: 16_000,
        bits_per_sample: 32,
        channels: 2,
    };
    assert_eq!(i2s_stereo.frame_bytes(), 8);
    let adc_mono = SourceFormat {
        sample_rate: 16_000,
        bits_per_sample: 16,
        channels: 1,
    };
    assert_eq!(adc_mono.frame_bytes(), 2);
}
