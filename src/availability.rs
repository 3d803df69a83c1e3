use std::fmt;

use crate::runpod::gpu_query::GpuAvailabilityRow;

/// Coarse stock level for one GPU type in one market, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AvailabilityTier {
    Unavailable,
    Low,
    Medium,
    High,
}

impl AvailabilityTier {
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Unavailable => "🔴",
            Self::Low => "🟠",
            Self::Medium => "🟡",
            Self::High => "🟢",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unavailable => "Unavailable",
            Self::Low => "Low Availability",
            Self::Medium => "Medium Availability",
            Self::High => "High Availability",
        }
    }
}

impl fmt::Display for AvailabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

/// Tiers a row from the two stock signals the marketplace reports, the
/// reservation-pool counter and the per-count histogram. The signals
/// regularly disagree, so the merged count is the larger of the two.
pub fn classify(row: &GpuAvailabilityRow) -> AvailabilityTier {
    if !row.found {
        return AvailabilityTier::Unavailable;
    }

    let pool = row.max_unreserved_count.max(0);
    let histogram = row.available_counts.iter().copied().max().unwrap_or(0);
    let available = pool.max(histogram);

    if available <= 0 {
        AvailabilityTier::Unavailable
    } else if available >= 3 {
        AvailabilityTier::High
    } else if available == 2 {
        AvailabilityTier::Medium
    } else {
        AvailabilityTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(found: bool, max_unreserved: i64, counts: &[i64]) -> GpuAvailabilityRow {
        GpuAvailabilityRow {
            found,
            name: "NVIDIA GeForce RTX 5090".to_string(),
            vram_gb: Some(32),
            stock_status: None,
            max_unreserved_count: max_unreserved,
            available_counts: counts.to_vec(),
            price_per_hour: None,
        }
    }

    #[test]
    fn test_missing_row_is_unavailable_despite_counts() {
        let tier = classify(&row(false, 5, &[4, 4]));
        assert_eq!(tier, AvailabilityTier::Unavailable);
        assert!(!tier.is_available());
    }

    #[test]
    fn test_zero_stock_is_unavailable() {
        assert_eq!(classify(&row(true, 0, &[])), AvailabilityTier::Unavailable);
        assert_eq!(
            classify(&row(true, 0, &[0, 0])),
            AvailabilityTier::Unavailable
        );
    }

    #[test]
    fn test_reservation_pool_alone_counts() {
        assert_eq!(classify(&row(true, 1, &[])), AvailabilityTier::Low);
    }

    #[test]
    fn test_histogram_alone_counts() {
        let tier = classify(&row(true, 0, &[0, 2, 0]));
        assert_eq!(tier, AvailabilityTier::Medium);
        assert!(tier.is_available());
    }

    #[test]
    fn test_three_or_more_is_high() {
        assert_eq!(classify(&row(true, 3, &[1])), AvailabilityTier::High);
        assert_eq!(classify(&row(true, 0, &[8])), AvailabilityTier::High);
    }

    #[test]
    fn test_negative_signals_clamp_to_unavailable() {
        assert_eq!(
            classify(&row(true, -4, &[-2, -1])),
            AvailabilityTier::Unavailable
        );
    }

    #[test]
    fn test_tier_never_drops_when_either_signal_grows() {
        let samples = [0, 1, 2, 3, 5];
        for &pool in &samples {
            for &hist in &samples {
                let base = classify(&row(true, pool, &[hist]));
                assert!(classify(&row(true, pool + 1, &[hist])) >= base);
                assert!(classify(&row(true, pool, &[hist + 1])) >= base);
            }
        }
    }
}
