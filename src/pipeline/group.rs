use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::{PipelineError, PipelineResult};

pub type OrderedMap<K, V> = IndexMap<K, V>;

pub trait Merge {
    fn merge_at(&mut self, other: Self, path: &mut Vec<String>) -> PipelineResult<()>;
}

impl<T> Merge for Vec<T> {
    fn merge_at(&mut self, other: Self, _path: &mut Vec<String>) -> PipelineResult<()> {
        self.extend(other);
        Ok(())
    }
}

impl<K, V> Merge for OrderedMap<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Merge,
{
    fn merge_at(&mut self, other: Self, path: &mut Vec<String>) -> PipelineResult<()> {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) => {
                    path.push(key.to_string());
                    let merged = existing.merge_at(value, path);
                    path.pop();
                    merged?;
                }
                None => {
                    self.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<T>(pub T);

impl<T: PartialEq> Merge for Leaf<T> {
    fn merge_at(&mut self, other: Self, path: &mut Vec<String>) -> PipelineResult<()> {
        if self.0 != other.0 {
            return Err(PipelineError::MergeConflict {
                path: path.join("."),
            });
        }
        Ok(())
    }
}

/// Merges `b` into `a`: lists concatenate, maps recurse, differing leaves fail
/// with the dotted path of the conflict.
pub fn merge_dict<K, V>(a: &mut OrderedMap<K, V>, b: OrderedMap<K, V>) -> PipelineResult<()>
where
    K: Eq + Hash + Clone + Display,
    V: Merge,
{
    a.merge_at(b, &mut Vec::new())
}

pub fn group_by_init<K, V, I>(items: I) -> PipelineResult<Vec<(K, Vec<V>)>>
where
    K: Eq + Hash + Clone + Display,
    I: IntoIterator<Item = PipelineResult<(K, V)>>,
{
    let mut grouped = OrderedMap::new();
    for item in items {
        let (key, value) = item?;
        merge_dict(&mut grouped, OrderedMap::from_iter([(key, vec![value])]))?;
    }
    Ok(grouped.into_iter().collect())
}

pub fn group_by_first<K, R, I>(items: I) -> Vec<(K, Vec<R>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, R)>,
{
    let mut grouped: OrderedMap<K, Vec<R>> = OrderedMap::new();
    for (key, rest) in items {
        match grouped.get_mut(&key) {
            Some(values) => values.push(rest),
            None => {
                grouped.insert(key, vec![rest]);
            }
        }
    }
    grouped.into_iter().collect()
}
