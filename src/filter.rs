/// Result filtering
///
/// Applied to every successful collection before anything reaches the
/// sink. Receives the gauge's own labels so a policy can decide based on
/// which gauge produced the values.
///
use crate::schema::{GaugeLabelValues, Label};

pub trait GaugeFilter: Send + Sync {
    fn filter(&self, values: Vec<GaugeLabelValues>, labels: &[Label]) -> Vec<GaugeLabelValues>;
}

/// Forwards everything unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl GaugeFilter for PassThrough {
    fn filter(&self, values: Vec<GaugeLabelValues>, _labels: &[Label]) -> Vec<GaugeLabelValues> {
        values
    }
}

/// Keeps only the `max` largest values.
///
/// Does not bound total cardinality across cycles, but keeps a single
/// runaway gauge from flooding the sink.
#[derive(Debug, Clone, Copy)]
pub struct CardinalityLimit {
    pub max: usize,
}

impl CardinalityLimit {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl GaugeFilter for CardinalityLimit {
    fn filter(&self, mut values: Vec<GaugeLabelValues>, _labels: &[Label]) -> Vec<GaugeLabelValues> {
        if values.len() > self.max {
            values.sort_by(|a, b| b.value.total_cmp(&a.value));
            values.truncate(self.max);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(name: &str, v: f64) -> GaugeLabelValues {
        GaugeLabelValues::new(vec![Label::new("mount", name)], v)
    }

    #[test]
    fn cardinality_limit_keeps_largest_values() {
        let values = vec![value("a", 1.0), value("b", 9.0), value("c", 5.0), value("d", 7.0)];

        let kept = CardinalityLimit::new(2).filter(values, &[]);

        let names: Vec<_> = kept.iter().map(|v| v.labels[0].value.as_str()).collect();
        assert_eq!(names, ["b", "d"]);
    }

    #[test]
    fn cardinality_limit_leaves_small_batches_in_order() {
        let values = vec![value("a", 1.0), value("b", 9.0)];

        let kept = CardinalityLimit::new(2).filter(values.clone(), &[]);

        assert_eq!(kept, values);
    }

    #[test]
    fn pass_through_is_identity() {
        let values = vec![value("a", 3.0)];
        assert_eq!(PassThrough.filter(values.clone(), &[]), values);
    }
}
