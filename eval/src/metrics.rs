//! Aggregate accuracy metrics over row comparisons.

use crate::compare::Comparison;

/// Absolute day-delta bucket, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaBucket {
    Exact,
    WithinDay,
    WithinThreeDays,
    WithinWeek,
    WithinMonth,
    WithinQuarter,
    Beyond,
}

impl DeltaBucket {
    pub const ALL: [DeltaBucket; 7] = [
        DeltaBucket::Exact,
        DeltaBucket::WithinDay,
        DeltaBucket::WithinThreeDays,
        DeltaBucket::WithinWeek,
        DeltaBucket::WithinMonth,
        DeltaBucket::WithinQuarter,
        DeltaBucket::Beyond,
    ];

    pub fn for_days(days: i64) -> Self {
        match days {
            0 => DeltaBucket::Exact,
            1 => DeltaBucket::WithinDay,
            2..=3 => DeltaBucket::WithinThreeDays,
            4..=7 => DeltaBucket::WithinWeek,
            8..=30 => DeltaBucket::WithinMonth,
            31..=90 => DeltaBucket::WithinQuarter,
            _ => DeltaBucket::Beyond,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeltaBucket::Exact => "== 0 days",
            DeltaBucket::WithinDay => "<= 1 day",
            DeltaBucket::WithinThreeDays => "<= 3 days",
            DeltaBucket::WithinWeek => "<= 7 days",
            DeltaBucket::WithinMonth => "<= 30 days",
            DeltaBucket::WithinQuarter => "<= 90 days",
            DeltaBucket::Beyond => "> 90 days",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub csv_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub exact_matches: usize,
    pub exact_nf_matches: usize,
    pub exact_date_matches: usize,
    pub wrong_phase_matches: usize,
    pub target_has_date: usize,
    pub predicted_missing_when_target_present: usize,
    pub pairs_with_both_dates: usize,
    bucket_counts: [usize; 7],
}

impl Metrics {
    pub fn bucket(&self, bucket: DeltaBucket) -> usize {
        self.bucket_counts[bucket.index()]
    }

    /// Buckets with their counts, in report order.
    pub fn buckets(&self) -> impl Iterator<Item = (DeltaBucket, usize)> + '_ {
        DeltaBucket::ALL
            .iter()
            .map(|bucket| (*bucket, self.bucket(*bucket)))
    }
}

pub fn aggregate(comparisons: &[Comparison], csv_rows: usize, unmatched: usize) -> Metrics {
    let count = |pred: fn(&Comparison) -> bool| comparisons.iter().filter(|c| pred(c)).count();

    let mut bucket_counts = [0usize; 7];
    let mut pairs_with_both_dates = 0;
    for delta in comparisons.iter().filter_map(|c| c.abs_days_delta) {
        pairs_with_both_dates += 1;
        bucket_counts[DeltaBucket::for_days(delta).index()] += 1;
    }

    Metrics {
        csv_rows,
        matched: comparisons.len(),
        unmatched,
        exact_matches: count(|c| c.exact_match),
        exact_nf_matches: count(|c| c.exact_nf_match),
        exact_date_matches: count(Comparison::exact_date_match),
        wrong_phase_matches: count(|c| c.wrong_phase_match),
        target_has_date: count(|c| c.target_date.is_some()),
        predicted_missing_when_target_present: count(|c| {
            c.target_date.is_some() && c.predicted_date.is_none()
        }),
        pairs_with_both_dates,
        bucket_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval_set::Phase;
    use chrono::NaiveDate;

    fn comparison(target: Option<&str>, predicted: Option<&str>) -> Comparison {
        let parse = |raw: Option<&str>| {
            raw.map(|r| NaiveDate::parse_from_str(r, "%Y-%m-%d").expect("date"))
        };
        let target = parse(target);
        let predicted = parse(predicted);
        let exact_date = target.is_some() && target == predicted;
        Comparison {
            component: "c".to_string(),
            phase: Phase::Active,
            target_date: target,
            predicted_date: predicted,
            predicted_other_date: None,
            exact_match: exact_date || (target.is_none() && predicted.is_none()),
            exact_nf_match: target.is_none() && predicted.is_none(),
            wrong_phase_match: false,
            abs_days_delta: target
                .zip(predicted)
                .map(|(t, p)| (p - t).num_days().abs()),
        }
    }

    #[test]
    fn bucket_boundaries_are_inclusive() {
        assert_eq!(DeltaBucket::for_days(0), DeltaBucket::Exact);
        assert_eq!(DeltaBucket::for_days(1), DeltaBucket::WithinDay);
        assert_eq!(DeltaBucket::for_days(3), DeltaBucket::WithinThreeDays);
        assert_eq!(DeltaBucket::for_days(7), DeltaBucket::WithinWeek);
        assert_eq!(DeltaBucket::for_days(30), DeltaBucket::WithinMonth);
        assert_eq!(DeltaBucket::for_days(90), DeltaBucket::WithinQuarter);
        assert_eq!(DeltaBucket::for_days(91), DeltaBucket::Beyond);
    }

    #[test]
    fn aggregates_counts_and_buckets() {
        let comparisons = vec![
            comparison(Some("2022-04-27"), Some("2022-04-27")),
            comparison(Some("2022-04-27"), Some("2022-05-01")),
            comparison(Some("2022-04-27"), None),
            comparison(None, None),
        ];

        let metrics = aggregate(&comparisons, 6, 2);

        assert_eq!(metrics.csv_rows, 6);
        assert_eq!(metrics.matched, 4);
        assert_eq!(metrics.unmatched, 2);
        assert_eq!(metrics.exact_matches, 2);
        assert_eq!(metrics.exact_nf_matches, 1);
        assert_eq!(metrics.exact_date_matches, 1);
        assert_eq!(metrics.target_has_date, 3);
        assert_eq!(metrics.predicted_missing_when_target_present, 1);
        assert_eq!(metrics.pairs_with_both_dates, 2);
        assert_eq!(metrics.bucket(DeltaBucket::Exact), 1);
        assert_eq!(metrics.bucket(DeltaBucket::WithinWeek), 1);
        assert_eq!(metrics.buckets().map(|(_, n)| n).sum::<usize>(), 2);
    }

    #[test]
    fn empty_comparisons_yield_zero_metrics() {
        let metrics = aggregate(&[], 3, 3);
        assert_eq!(metrics.matched, 0);
        assert_eq!(metrics.pairs_with_both_dates, 0);
        assert!(metrics.buckets().all(|(_, n)| n == 0));
    }
}
