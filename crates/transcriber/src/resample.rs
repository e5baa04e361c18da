//! Linear-interpolation resampling to the canonical 16 kHz rate (spec §4.2:
//! "the transcriber performs resampling when input rate differs").

use orchestrator_core::SampleRate;

/// Resamples `samples`, captured at `from_rate`, to [`SampleRate::CANONICAL`].
/// A no-op when the input is already canonical.
pub fn to_canonical_rate(samples: &[i16], from_rate: SampleRate) -> Vec<i16> {
    let to_hz = SampleRate::CANONICAL.0 as f64;
    let from_hz = from_rate.0 as f64;

    if from_rate == SampleRate::CANONICAL || samples.is_empty() || from_hz == 0.0 {
        return samples.to_vec();
    }

    let ratio = to_hz / from_hz;
    let out_len = ((samples.len() as f64) * ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = (src_pos.floor() as usize).min(last);
            let frac = src_pos - idx as f64;
            let s0 = samples[idx] as f64;
            let s1 = samples[(idx + 1).min(last)] as f64;
            (s0 + (s1 - s0) * frac).round() as i16
        })
        .collect()
}
