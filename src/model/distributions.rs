//! Closed-form CDF for the sum of independent uniform [0, 1] variables
//! (the Irwin–Hall distribution). The probability engine evaluates it at
//! small `n`, so the naive factorial/binomial terms are fine.

/// CDF of the sum of `n` independent uniform [0, 1] variables at `x`.
///
/// Outside the support this clamps to 0 below and 1 above. Inside, the
/// piecewise-polynomial form is
/// `0.5 + (1 / 2n!) * sum_{k=0..n} (-1)^k C(n,k) sgn(x-k) (x-k)^n`
/// with `sgn(0) = 0`.
pub fn uniform_sum_cdf(n: u32, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= n as f64 {
        return 1.0;
    }

    let mut acc = 0.0;
    for k in 0..=n {
        let t = x - k as f64;
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        acc += sign * binomial(n, k) * signum_or_zero(t) * t.powi(n as i32);
    }

    0.5 + acc / (2.0 * factorial(n))
}

fn signum_or_zero(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else {
        t.signum()
    }
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(|i| i as f64).product()
}

fn binomial(n: u32, k: u32) -> f64 {
    factorial(n) / (factorial(k) * factorial(n - k))
}
