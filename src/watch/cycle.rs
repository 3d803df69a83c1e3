use crate::availability::AvailabilityTier;
use crate::market::MarketScope;
use crate::runpod::gpu_query::GpuAvailabilityRow;

#[derive(Debug, Clone)]
pub struct CycleEntry {
    pub line: String,
    pub tier: AvailabilityTier,
}

/// Outcome of one pass over every watched GPU and market: the printable
/// report plus the aggregate signal the notification throttle keys on.
#[derive(Debug)]
pub struct CycleReport {
    header: String,
    entries: Vec<CycleEntry>,
}

impl CycleReport {
    pub fn new(header: String) -> Self {
        Self {
            header,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, scope: MarketScope, row: &GpuAvailabilityRow, tier: AvailabilityTier) {
        self.entries.push(CycleEntry {
            line: format_entry(scope, row, tier),
            tier,
        });
    }

    pub fn any_available(&self) -> bool {
        self.entries.iter().any(|entry| entry.tier.is_available())
    }

    /// Line of the first available entry in scan order. This is the alert
    /// body.
    pub fn first_available_message(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.tier.is_available())
            .map(|entry| entry.line.as_str())
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.header.as_str())
            .chain(self.entries.iter().map(|entry| entry.line.as_str()))
    }
}

pub fn format_entry(scope: MarketScope, row: &GpuAvailabilityRow, tier: AvailabilityTier) -> String {
    let name = short_gpu_name(&row.name);
    let vram = match row.vram_gb {
        Some(vram) => format!("({vram}GB)"),
        None => String::new(),
    };

    let line = if tier.is_available() {
        format!(
            "[{scope}] {name} {vram} | {tier} | {}",
            format_price(row.price_per_hour)
        )
    } else {
        format!("[{scope}] {name} {vram} | {tier}")
    };

    collapse_spaces(&line)
}

pub fn short_gpu_name(name: &str) -> &str {
    for prefix in ["NVIDIA GeForce ", "NVIDIA "] {
        if let Some(stripped) = name.strip_prefix(prefix) {
            return stripped;
        }
    }
    name
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) => format!("${value:.2}/hr"),
        None => "$?/hr".to_string(),
    }
}

fn collapse_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, vram_gb: Option<i64>, price: Option<f64>) -> GpuAvailabilityRow {
        GpuAvailabilityRow {
            found: true,
            name: name.to_string(),
            vram_gb,
            stock_status: None,
            max_unreserved_count: 0,
            available_counts: Vec::new(),
            price_per_hour: price,
        }
    }

    #[test]
    fn test_available_line_carries_the_price() {
        let line = format_entry(
            MarketScope::Secure,
            &row("NVIDIA GeForce RTX 5090", Some(32), Some(0.89)),
            AvailabilityTier::High,
        );
        assert_eq!(
            line,
            "[SECURE] RTX 5090 (32GB) | 🟢 High Availability | $0.89/hr"
        );
    }

    #[test]
    fn test_unavailable_line_omits_the_price() {
        let line = format_entry(
            MarketScope::Community,
            &row("NVIDIA GeForce RTX 5090", Some(32), Some(0.89)),
            AvailabilityTier::Unavailable,
        );
        assert_eq!(line, "[COMMUNITY] RTX 5090 (32GB) | 🔴 Unavailable");
    }

    #[test]
    fn test_missing_vram_leaves_no_double_space() {
        let line = format_entry(
            MarketScope::Secure,
            &row("NVIDIA L40S", None, None),
            AvailabilityTier::Low,
        );
        assert_eq!(line, "[SECURE] L40S | 🟠 Low Availability | $?/hr");
    }

    #[test]
    fn test_short_gpu_name_strips_vendor_prefixes() {
        assert_eq!(short_gpu_name("NVIDIA GeForce RTX 4090"), "RTX 4090");
        assert_eq!(short_gpu_name("NVIDIA H200"), "H200");
        assert_eq!(short_gpu_name("AMD Instinct MI300X"), "AMD Instinct MI300X");
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(Some(0.456)), "$0.46/hr");
        assert_eq!(format_price(Some(2.0)), "$2.00/hr");
        assert_eq!(format_price(None), "$?/hr");
    }

    #[test]
    fn test_report_tracks_first_available_entry() {
        let mut report = CycleReport::new("Checking global GPU Pool...".to_string());
        assert!(!report.any_available());
        assert_eq!(report.first_available_message(), None);

        report.push(
            MarketScope::Secure,
            &row("NVIDIA H200", Some(141), None),
            AvailabilityTier::Unavailable,
        );
        assert!(!report.any_available());

        report.push(
            MarketScope::Secure,
            &row("NVIDIA GeForce RTX 5090", Some(32), Some(0.89)),
            AvailabilityTier::Medium,
        );
        report.push(
            MarketScope::Community,
            &row("NVIDIA GeForce RTX 5090", Some(32), Some(0.69)),
            AvailabilityTier::High,
        );

        assert!(report.any_available());
        assert_eq!(
            report.first_available_message(),
            Some("[SECURE] RTX 5090 (32GB) | 🟡 Medium Availability | $0.89/hr")
        );

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Checking global GPU Pool...");
    }
}
