//! Two-sample distribution statistics for drift detection.

/// Result of a two-sample Kolmogorov–Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Maximum distance between the two empirical CDFs
    pub statistic: f64,

    /// Asymptotic two-sided p-value
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov test.
///
/// Returns `None` when either sample is empty. The p-value uses the
/// asymptotic Kolmogorov distribution with the Stephens small-sample
/// correction, which is accurate enough for the p < 0.05 drift decision.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Option<KsResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let mut xs = a.to_vec();
    let mut ys = b.to_vec();
    xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
    ys.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));

    let n1 = xs.len() as f64;
    let n2 = ys.len() as f64;

    // Sweep both sorted samples, tracking the ECDF gap at every step.
    let mut i = 0;
    let mut j = 0;
    let mut statistic = 0.0f64;
    while i < xs.len() && j < ys.len() {
        let x = xs[i];
        let y = ys[j];
        if x <= y {
            i += 1;
        }
        if y <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 - j as f64 / n2).abs();
        if gap > statistic {
            statistic = gap;
        }
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;
    let p_value = kolmogorov_survival(lambda);

    Some(KsResult { statistic, p_value })
}

/// Q(lambda) = 2 * sum_{j>=1} (-1)^(j-1) exp(-2 j^2 lambda^2)
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    let mut sum = 0.0f64;
    let mut sign = 1.0f64;
    for j in 1..=100 {
        let term = (-2.0 * (j as f64).powi(2) * lambda.powi(2)).exp();
        sum += sign * term;
        sign = -sign;
        if term < 1e-12 {
            break;
        }
    }

    (2.0 * sum).clamp(0.0, 1.0)
}
