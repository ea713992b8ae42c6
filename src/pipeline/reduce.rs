use crate::error::{PipelineError, PipelineResult};
use crate::model::{GroupedStats, SequencePoint, StatPoint};
use crate::pipeline::group::group_by_first;

pub fn mean_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    Some((mean, variance.sqrt()))
}

pub fn parse_rate(rate: &str) -> PipelineResult<u32> {
    rate.trim()
        .parse::<u32>()
        .map_err(|_| PipelineError::InvalidRate(rate.to_string()))
}

pub fn reduce<I>(groups: I) -> PipelineResult<Vec<(String, StatPoint)>>
where
    I: IntoIterator<Item = (String, String, Vec<f64>)>,
{
    let mut points = Vec::new();
    for (variant, rate, values) in groups {
        let Some((mean, stddev)) = mean_stddev(&values) else {
            continue;
        };
        points.push((
            variant,
            StatPoint {
                rate: parse_rate(&rate)?,
                mean,
                stddev,
            },
        ));
    }
    Ok(points)
}

pub fn summarize<I>(groups: I) -> PipelineResult<GroupedStats>
where
    I: IntoIterator<Item = (String, String, Vec<f64>)>,
{
    Ok(group_by_first(reduce(groups)?).into_iter().collect())
}

pub fn sequence_profile(runs: &[Vec<f64>]) -> Vec<SequencePoint> {
    let longest = runs.iter().map(Vec::len).max().unwrap_or(0);
    (0..longest)
        .filter_map(|position| {
            let column: Vec<f64> = runs
                .iter()
                .filter_map(|run| run.get(position).copied())
                .collect();
            mean_stddev(&column).map(|(mean, stddev)| SequencePoint {
                seq: position + 1,
                mean,
                stddev,
                samples: column.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-12
    }

    #[test]
    fn mean_stddev_uses_population_definition() {
        let (mean, stddev) = mean_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("non-empty");
        assert!(close(mean, 5.0));
        assert!(close(stddev, 2.0));

        assert_eq!(mean_stddev(&[]), None);
    }

    #[test]
    fn reduce_omits_empty_groups_and_never_emits_nan() {
        let points = reduce(vec![
            ("plain".to_string(), "100".to_string(), vec![]),
            ("plain".to_string(), "200".to_string(), vec![0.5]),
        ])
        .expect("reduce succeeds");

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1.rate, 200);
        assert!(points.iter().all(|(_, point)| !point.mean.is_nan() && !point.stddev.is_nan()));
    }

    #[test]
    fn reduce_rejects_non_integer_rates() {
        let err = reduce(vec![("plain".to_string(), "fast".to_string(), vec![1.0])])
            .expect_err("rate must be an integer");
        assert!(matches!(err, PipelineError::InvalidRate(rate) if rate == "fast"));
    }

    #[test]
    fn summarize_groups_points_per_variant() {
        let stats = summarize(vec![
            ("plain".to_string(), "100".to_string(), vec![0.10, 0.12]),
            ("istio".to_string(), "100".to_string(), vec![0.2]),
            ("plain".to_string(), "200".to_string(), vec![0.3]),
        ])
        .expect("summarize succeeds");

        let plain = stats.get(&"plain".to_string()).expect("plain present");
        assert_eq!(plain.len(), 2);
        assert!(close(plain[0].mean, 0.11));
        assert!(close(plain[0].stddev, 0.01));
        assert_eq!(plain[1].rate, 200);
        assert_eq!(stats.keys().collect::<Vec<_>>(), vec!["plain", "istio"]);
    }

    #[test]
    fn sequence_profile_handles_runs_of_different_length() {
        let profile = sequence_profile(&[vec![1.0, 2.0, 3.0], vec![3.0, 4.0]]);

        assert_eq!(profile.len(), 3);
        assert_eq!(profile[0].seq, 1);
        assert!(close(profile[0].mean, 2.0));
        assert!(close(profile[0].stddev, 1.0));
        assert_eq!(profile[2].samples, 1);
        assert!(close(profile[2].mean, 3.0));
        assert!(close(profile[2].stddev, 0.0));
    }
}
