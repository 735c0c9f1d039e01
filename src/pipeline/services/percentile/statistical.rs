/// Population mean severity.
pub const POPULATION_MEAN: f64 = 5.0;
/// Population severity standard deviation.
pub const POPULATION_STD_DEV: f64 = 2.5;

/// Abramowitz & Stegun 7.1.26; absolute error below 1.5e-7.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (std_dev * std::f64::consts::SQRT_2)))
}

/// Percentile of a severity score against the assumed population, in [1, 99].
pub fn statistical_percentile(score: f64) -> u8 {
    let cdf = normal_cdf(score, POPULATION_MEAN, POPULATION_STD_DEV);
    clamp_percentile(cdf * 100.0)
}

pub fn clamp_percentile(value: f64) -> u8 {
    if value.is_nan() {
        return 50;
    }
    value.round().clamp(1.0, 99.0) as u8
}
