use std::fmt;

use crate::model::VolumeRecord;

/// End-of-run figures over a batch of records.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub total_volume_m3: f64,
    pub avg_volume_m3: Option<f64>,
    pub avg_height_m: Option<f64>,
}

impl BatchSummary {
    pub fn from_records(records: &[VolumeRecord]) -> Self {
        let successful: Vec<&VolumeRecord> = records.iter().filter(|r| r.is_success()).collect();
        let count = successful.len();
        let total_volume_m3: f64 = successful.iter().map(|r| r.volume_m3).sum();
        let total_height: f64 = successful.iter().map(|r| r.mean_height_m).sum();

        let (avg_volume_m3, avg_height_m) = if count > 0 {
            (
                Some(total_volume_m3 / count as f64),
                Some(total_height / count as f64),
            )
        } else {
            (None, None)
        };

        Self {
            total: records.len(),
            successful: count,
            total_volume_m3,
            avg_volume_m3,
            avg_height_m,
        }
    }

    pub fn log(&self) {
        for line in self.to_string().lines() {
            tracing::info!("{}", line);
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Successful: {}/{}", self.successful, self.total)?;
        if let (Some(avg_volume), Some(avg_height)) = (self.avg_volume_m3, self.avg_height_m) {
            writeln!(f, "Total volume: {} m³", group_thousands(self.total_volume_m3))?;
            writeln!(f, "Avg volume: {} m³", group_thousands(avg_volume))?;
            writeln!(f, "Avg height: {:.1} m", avg_height)?;
        }
        Ok(())
    }
}

/// Whole number with comma thousands separators, e.g. `1,234,567`.
fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value.round() < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}
