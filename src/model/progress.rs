use super::*;
use crate::time::epoch_millis;

/// Last known playback position of one video, as persisted between page loads.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, new)]
pub struct ProgressRecord {
    /// elapsed seconds
    pub time: f64,
    /// epoch milliseconds of the write
    pub timestamp: i64,
}

impl ProgressRecord {
    pub fn now(time: f64) -> Self {
        Self::new(time, epoch_millis())
    }

    /// Resume point this record stands for; anything that isn't a finite, positive number means none.
    pub fn resume_point(&self) -> f64 {
        if self.time.is_finite() && self.time > 0.0 {
            self.time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_layout() {
        let record = ProgressRecord::new(42.5, 1_700_000_000_000);
        let json = serde_json::to_value(record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"time": 42.5, "timestamp": 1_700_000_000_000_i64})
        );
    }

    #[test]
    fn negative_time_resumes_from_start() {
        assert_eq!(ProgressRecord::new(-3.0, 0).resume_point(), 0.0);
        assert_eq!(ProgressRecord::new(f64::NAN, 0).resume_point(), 0.0);
        assert_eq!(ProgressRecord::new(12.0, 0).resume_point(), 12.0);
    }
}
