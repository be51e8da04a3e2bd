//! Motion-blur time samples.

/// Sorts motion sample times and rebases them onto the earliest sample.
///
/// The result starts at `0.0` and keeps the relative spacing of the input.
/// When the samples span more than one unit they are additionally scaled so
/// the last sample lands on `1.0`; spans of one unit or less are only shifted.
/// Non-finite samples are dropped.
#[must_use]
pub fn normalize_time_samples(samples: &[f32]) -> Vec<f32> {
    let mut times: Vec<f32> = samples.iter().copied().filter(|t| t.is_finite()).collect();
    times.sort_by(f32::total_cmp);

    let Some(&first) = times.first() else {
        return times;
    };
    let span = times.last().map_or(0.0, |last| last - first);
    let scale = if span > 1.0 { span.recip() } else { 1.0 };

    for t in &mut times {
        *t = (*t - first) * scale;
    }
    times
}
