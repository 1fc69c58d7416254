use crate::domain::errors::TechnicalAnalysisError;

const MIN_PERIOD: usize = 5;
const MAX_PERIOD: usize = 200;

fn check_period(len: usize, period: usize) -> Result<(), TechnicalAnalysisError> {
    if !(MIN_PERIOD..=MAX_PERIOD).contains(&period) {
        return Err(TechnicalAnalysisError::PeriodOutOfRange {
            period,
            min: MIN_PERIOD,
            max: MAX_PERIOD,
        });
    }
    if len < period {
        return Err(TechnicalAnalysisError::SeriesTooShort { len, period });
    }
    Ok(())
}

/// Simple moving average with min-periods 1: early rows average over the
/// available prefix.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>, TechnicalAnalysisError> {
    check_period(values.len(), period)?;

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        let window = (i + 1).min(period);
        out.push(sum / window as f64);
    }
    Ok(out)
}

/// Rolling simple moving average that yields 0.0 until a full window is
/// available (min-periods = window). Used by the Fibonacci Bollinger mid.
pub fn sma_strict(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Standard recursive EMA with smoothing `2 / (period + 1)`, seeded with
/// the first value (the adjust = false form).
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>, TechnicalAnalysisError> {
    check_period(values.len(), period)?;
    Ok(ema_unchecked(values, period))
}

pub(crate) fn ema_unchecked(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(prev);
    for v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Cumulative (expanding) moving average.
pub fn cma(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        out.push(sum / (i + 1) as f64);
    }
    out
}

/// Linearly weighted moving average; early rows weight the available
/// prefix.
pub fn wma(values: &[f64], period: usize) -> Result<Vec<f64>, TechnicalAnalysisError> {
    check_period(values.len(), period)?;

    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let window = (i + 1).min(period);
        let start = i + 1 - window;
        let mut num = 0.0;
        let mut den = 0.0;
        for (w, v) in values[start..=i].iter().enumerate() {
            let weight = (w + 1) as f64;
            num += weight * v;
            den += weight;
        }
        out.push(num / den);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_min_periods_one() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let result = sma(&values, 5).unwrap();

        assert_eq!(result[0], 1.0);
        assert_eq!(result[1], 1.5);
        assert_eq!(result[4], 3.0);
        assert_eq!(result[6], 5.0);
    }

    #[test]
    fn test_sma_rejects_bad_period() {
        let values = vec![1.0; 300];
        assert_eq!(
            sma(&values, 4),
            Err(TechnicalAnalysisError::PeriodOutOfRange {
                period: 4,
                min: 5,
                max: 200
            })
        );
        assert_eq!(
            sma(&values, 201),
            Err(TechnicalAnalysisError::PeriodOutOfRange {
                period: 201,
                min: 5,
                max: 200
            })
        );
        assert_eq!(
            sma(&values[..10], 20),
            Err(TechnicalAnalysisError::SeriesTooShort { len: 10, period: 20 })
        );
    }

    #[test]
    fn test_ema_recursion() {
        let values = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let result = ema(&values, 5).unwrap();

        // alpha = 2/6, seeded with the first close
        let alpha = 2.0 / 6.0;
        assert_eq!(result[0], 10.0);
        let expected1 = alpha * 11.0 + (1.0 - alpha) * 10.0;
        assert!((result[1] - expected1).abs() < 1e-12);
    }

    #[test]
    fn test_ema_converges_toward_constant() {
        let values = vec![5.0; 100];
        let result = ema(&values, 12).unwrap();
        assert!((result[99] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_cma_expanding() {
        let values = vec![2.0, 4.0, 6.0];
        assert_eq!(cma(&values), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_wma_weights_recent_values() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 10.0];
        let wma5 = wma(&values, 5).unwrap()[4];
        let sma5 = sma(&values, 5).unwrap()[4];
        assert!(wma5 > sma5, "WMA should weight the latest value more");
    }

    #[test]
    fn test_sma_strict_prefix_is_zero() {
        let values = vec![1.0; 25];
        let result = sma_strict(&values, 20);
        assert_eq!(result[18], 0.0);
        assert_eq!(result[19], 1.0);
        assert_eq!(result[24], 1.0);
    }
}
