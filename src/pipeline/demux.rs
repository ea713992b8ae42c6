use std::collections::HashMap;

use crate::model::{CodeClass, DataType};
use crate::pipeline::extract::{Observation, ObservationKey};

pub trait Tagged {
    fn data_type(&self) -> DataType;
}

impl Tagged for Observation {
    fn data_type(&self) -> DataType {
        self.key.data_type
    }
}

impl<V> Tagged for (ObservationKey, V) {
    fn data_type(&self) -> DataType {
        self.0.data_type
    }
}

pub const MAIN_LATENCY_TAGS: &[DataType] = &[DataType::SummaryLatency, DataType::RawLatency];
pub const SUCCESS_LATENCY_TAGS: &[DataType] = &[DataType::RawLatencySuccess];

#[derive(Debug)]
pub struct Split<T> {
    pub routes: Vec<Vec<T>>,
    pub rest: Vec<T>,
}

/// Partitions `items` by tag. A tag listed by several routes goes to the first
/// one only, so the outputs are always disjoint.
pub fn split<T, I>(items: I, routes: &[&[DataType]]) -> Split<T>
where
    T: Tagged,
    I: IntoIterator<Item = T>,
{
    let mut route_of = HashMap::new();
    for (position, tags) in routes.iter().enumerate() {
        for tag in *tags {
            route_of.entry(*tag).or_insert(position);
        }
    }

    let mut out = Split {
        routes: routes.iter().map(|_| Vec::new()).collect(),
        rest: Vec::new(),
    };
    for item in items {
        match route_of.get(&item.data_type()) {
            Some(position) => out.routes[*position].push(item),
            None => out.rest.push(item),
        }
    }
    out
}

#[derive(Debug)]
pub struct Demultiplexed<T> {
    pub main_latencies: Vec<T>,
    pub success_latencies: Vec<T>,
    pub success_rates: Vec<T>,
    pub code_classes: Vec<(CodeClass, Vec<T>)>,
    pub unrecognized: Vec<T>,
}

pub fn demultiplex<T, I>(items: I) -> Demultiplexed<T>
where
    T: Tagged,
    I: IntoIterator<Item = T>,
{
    let first = split(items, &[MAIN_LATENCY_TAGS, SUCCESS_LATENCY_TAGS]);
    let [main_latencies, success_latencies]: [Vec<T>; 2] = into_array(first.routes);

    let success_tags = [DataType::SummarySuccessRate];
    let class_tags = CodeClass::ALL.map(|class| [class.data_type()]);
    let mut rate_routes: Vec<&[DataType]> = vec![success_tags.as_slice()];
    rate_routes.extend(class_tags.iter().map(|tags| tags.as_slice()));

    let second = split(first.rest, &rate_routes);
    let mut buckets = second.routes.into_iter();
    let success_rates = buckets.next().unwrap_or_default();
    let code_classes = CodeClass::ALL
        .into_iter()
        .zip(buckets)
        .collect::<Vec<_>>();

    Demultiplexed {
        main_latencies,
        success_latencies,
        success_rates,
        code_classes,
        unrecognized: second.rest,
    }
}

fn into_array<T, const N: usize>(routes: Vec<Vec<T>>) -> [Vec<T>; N] {
    let mut routes = routes.into_iter();
    std::array::from_fn(|_| routes.next().unwrap_or_default())
}
