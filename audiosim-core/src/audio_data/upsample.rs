/// Doubles the sample rate of a raw impulse response by linear interpolation.
///
/// Even output samples copy the input, odd samples average the two neighbours.
/// The last odd sample has no right neighbour and is half of the sample before it.
pub fn upsample_2x(raw: &[f32]) -> Vec<f64> {
    let mut out = Vec::with_capacity(raw.len() * 2);

    for pair in raw.windows(2) {
        let (a, b) = (pair[0] as f64, pair[1] as f64);
        out.push(a);
        out.push((a + b) / 2.0);
    }

    if let Some(&last) = raw.last() {
        let last = last as f64;
        out.push(last);
        out.push(last / 2.0);
    }

    out
}
