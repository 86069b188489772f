use rand::Rng;

/// Baseline retry delay used when a message doesn't specify its own
/// (`original_source` `retry.DefaultBaseDelay`).
pub const DEFAULT_BASE_DELAY_SECS: u64 = 30;

/// Upper clamp on any computed retry delay.
pub const MAX_DELAY_SECS: u64 = 3600;

/// Fraction of the computed delay added/subtracted as jitter.
pub const JITTER_FACTOR: f64 = 0.1;

/// Classification of a delivery failure, used both to pick a backoff curve
/// and to decide whether a retry makes sense at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    RateLimit,
    NetworkError,
    ApiError,
    InvalidNumber,
}

impl ErrorCategory {
    /// Classify a lowercase-insensitive error message the way the vendor
    /// client's error text is categorized upstream of the queue.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("429") {
            ErrorCategory::RateLimit
        } else if lower.contains("network") || lower.contains("timeout") {
            ErrorCategory::NetworkError
        } else if lower.contains("invalid") && lower.contains("number") {
            ErrorCategory::InvalidNumber
        } else {
            ErrorCategory::ApiError
        }
    }

    /// Whether a message in this category should be retried at all.
    /// `InvalidNumber` is permanent: no amount of waiting fixes a bad
    /// destination.
    pub fn should_retry(self) -> bool {
        !matches!(self, ErrorCategory::InvalidNumber)
    }
}

/// Compute the delay before the next retry attempt, in seconds.
///
/// `retry_count` is the number of attempts already made (0 for the first
/// retry). `base_delay` falls back to [`DEFAULT_BASE_DELAY_SECS`] when zero.
/// The growth curve depends on `category`: rate limiting backs off the
/// hardest, network errors the softest, everything else doubles.
pub fn next_retry_delay_secs(retry_count: u32, base_delay: u64, category: ErrorCategory) -> u64 {
    let base_delay = if base_delay == 0 {
        DEFAULT_BASE_DELAY_SECS
    } else {
        base_delay
    };

    let multiplier = match category {
        ErrorCategory::RateLimit => 2f64.powi(retry_count as i32) * 2.0,
        ErrorCategory::NetworkError => 1.5f64.powi(retry_count as i32),
        ErrorCategory::ApiError | ErrorCategory::InvalidNumber => 2f64.powi(retry_count as i32),
    };

    let mut delay = base_delay as f64 * multiplier;

    let mut rng = rand::thread_rng();
    let jitter_sign: f64 = rng.gen_range(-1.0..=1.0);
    delay += delay * JITTER_FACTOR * jitter_sign;

    if delay > MAX_DELAY_SECS as f64 {
        delay = MAX_DELAY_SECS as f64;
    }
    if delay < 0.0 {
        delay = 0.0;
    }

    delay as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_and_network_and_invalid_number() {
        assert_eq!(
            ErrorCategory::classify("HTTP 429 rate limit exceeded"),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorCategory::classify("network timeout talking to vendor"),
            ErrorCategory::NetworkError
        );
        assert_eq!(
            ErrorCategory::classify("invalid phone number supplied"),
            ErrorCategory::InvalidNumber
        );
        assert_eq!(
            ErrorCategory::classify("vendor returned 500"),
            ErrorCategory::ApiError
        );
    }

    #[test]
    fn invalid_number_never_retries() {
        assert!(!ErrorCategory::InvalidNumber.should_retry());
        assert!(ErrorCategory::RateLimit.should_retry());
        assert!(ErrorCategory::NetworkError.should_retry());
        assert!(ErrorCategory::ApiError.should_retry());
    }

    #[test]
    fn delay_grows_with_retry_count_and_stays_clamped() {
        for count in 0..20 {
            let delay = next_retry_delay_secs(count, 30, ErrorCategory::RateLimit);
            assert!(delay <= MAX_DELAY_SECS);
        }
    }

    #[test]
    fn zero_base_delay_falls_back_to_default() {
        // With retry_count 0 the multiplier for ApiError is 2^0 = 1, so the
        // delay should land close to the default base delay (modulo jitter).
        let delay = next_retry_delay_secs(0, 0, ErrorCategory::ApiError);
        let lower = (DEFAULT_BASE_DELAY_SECS as f64 * (1.0 - JITTER_FACTOR)) as u64;
        let upper = (DEFAULT_BASE_DELAY_SECS as f64 * (1.0 + JITTER_FACTOR)) as u64 + 1;
        assert!(delay >= lower && delay <= upper, "delay {delay} out of range");
    }

    #[test]
    fn rate_limit_backs_off_harder_than_network_error() {
        // Compare the un-jittered trend by sampling many times and taking the
        // minimum, which approaches the un-jittered value from below.
        let rate_limit_min = (0..50)
            .map(|_| next_retry_delay_secs(3, 30, ErrorCategory::RateLimit))
            .min()
            .unwrap();
        let network_min = (0..50)
            .map(|_| next_retry_delay_secs(3, 30, ErrorCategory::NetworkError))
            .min()
            .unwrap();
        assert!(rate_limit_min > network_min);
    }
}
