use crate::telemetry::DailyPoint;

/// Replaces weak values (`<= threshold` or null) for display.
///
/// Interior gaps are filled linearly by position, not by calendar distance; leading gaps take
/// the first strong value and trailing gaps the last one. Dates are left untouched. A series
/// with no strong value at all comes back with every value null.
pub fn interpolate_display(series: &[DailyPoint], threshold: f64) -> Vec<DailyPoint> {
    let strong: Vec<Option<f64>> = series
        .iter()
        .map(|point| point.value.filter(|v| *v > threshold))
        .collect();

    let anchors: Vec<usize> = strong
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| value.map(|_| idx))
        .collect();

    series
        .iter()
        .enumerate()
        .map(|(idx, point)| {
            let value = match strong[idx] {
                Some(v) => Some(v),
                None => fill_at(idx, &anchors, &strong),
            };
            DailyPoint::new(point.date, value)
        })
        .collect()
}

fn fill_at(idx: usize, anchors: &[usize], strong: &[Option<f64>]) -> Option<f64> {
    let after = anchors.partition_point(|anchor| *anchor < idx);
    let prev = after.checked_sub(1).map(|i| anchors[i]);
    let next = anchors.get(after).copied();

    match (prev, next) {
        (Some(p), Some(q)) => {
            let (vp, vq) = (strong[p]?, strong[q]?);
            let fraction = (idx - p) as f64 / (q - p) as f64;
            Some(vp + (vq - vp) * fraction)
        }
        (Some(p), None) => strong[p],
        (None, Some(q)) => strong[q],
        (None, None) => None,
    }
}
