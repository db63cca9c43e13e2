//! Statistical primitives over numeric columns.
//!
//! Note: `quantile` may reorder the input slice.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator). `None` with fewer than two
/// values, where the estimate is undefined.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Standardized deviation from the mean for every value.
///
/// Returns `None` when the standard deviation is zero or undefined (all
/// values identical, or fewer than two values); the caller decides what an
/// undefined z-score means instead of dividing by zero.
pub fn z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let std = sample_std(values)?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m) / std).collect())
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        values[lo]
    } else {
        let frac = pos - lo as f64;
        values[lo] * (1.0 - frac) + values[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_of_known_values() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        // Sample variance of the set above is 32/7.
        let std = sample_std(&v).unwrap();
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn z_scores_are_undefined_for_constant_input() {
        assert!(z_scores(&[5.0, 5.0, 5.0]).is_none());
        assert!(z_scores(&[5.0]).is_none());
        assert!(z_scores(&[]).is_none());
    }

    #[test]
    fn z_scores_center_and_scale() {
        let z = z_scores(&[1.0, 2.0, 3.0]).unwrap();
        assert!((z[0] + 1.0).abs() < 1e-12);
        assert!(z[1].abs() < 1e-12);
        assert!((z[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let mut v = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&mut v, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&mut v, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&mut v, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile(&mut v, 1.0) - 4.0).abs() < 1e-12);
    }
}
