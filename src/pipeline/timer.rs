use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub label: &'static str,
    pub elapsed: Duration,
}

/// Records the time between successive checkpoints of one operation.
pub struct SplitTimer {
    name: &'static str,
    last: Instant,
    splits: Vec<Split>,
}

impl SplitTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            last: Instant::now(),
            splits: Vec::new(),
        }
    }

    pub fn end_split(&mut self, label: &'static str) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        tracing::debug!(timer = self.name, split = label, ?elapsed, "split");
        self.splits.push(Split { label, elapsed });
    }

    pub fn into_splits(self) -> Vec<Split> {
        self.splits
    }
}

/// Renders splits as `label: 1.234ms, ...`.
pub struct SplitSummary<'a>(pub &'a [Split]);

impl fmt::Display for SplitSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, split) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}: {:.3}ms",
                split.label,
                split.elapsed.as_secs_f64() * 1000.0
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_recorded_in_order() {
        let mut timer = SplitTimer::new("test");
        timer.end_split("first");
        timer.end_split("second");
        let splits = timer.into_splits();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].label, "first");
        assert_eq!(splits[1].label, "second");
    }

    #[test]
    fn test_summary_format() {
        let splits = [
            Split {
                label: "feed",
                elapsed: Duration::from_micros(1500),
            },
            Split {
                label: "run",
                elapsed: Duration::from_millis(20),
            },
        ];
        assert_eq!(
            SplitSummary(&splits).to_string(),
            "feed: 1.500ms, run: 20.000ms"
        );
    }
}
