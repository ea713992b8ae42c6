use std::collections::HashMap;

use crate::pipeline::group::OrderedMap;

pub const CANONICAL_VARIANTS: &[&str] = &[
    "plain",
    "istio",
    "passthrough-filter",
    "tooling-filter",
    "prose-no-presidio-filter",
    "prose-cached-presidio-filter",
    "prose-filter",
    "prose-filter-97776ef1",
    "prose-filter-8ec667ab",
    "filter-passthrough-buffer",
    "filter-traces",
    "filter-traces-opa",
];

pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("envoy", "istio"),
    ("filter", "prose-filter"),
    ("filter-passthrough", "passthrough-filter"),
    ("filter-traces-opa-singleton", "tooling-filter"),
    ("filter-97776ef1", "prose-filter-97776ef1"),
];

#[derive(Debug, Clone)]
pub struct VariantAliases {
    aliases: HashMap<String, String>,
}

impl Default for VariantAliases {
    fn default() -> Self {
        let identity = CANONICAL_VARIANTS
            .iter()
            .map(|name| (name.to_string(), name.to_string()));
        let legacy = LEGACY_ALIASES
            .iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()));
        Self {
            aliases: identity.chain(legacy).collect(),
        }
    }
}

impl VariantAliases {
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (raw, canonical) in overrides {
            self.aliases.insert(raw.clone(), canonical.clone());
        }
        self
    }

    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.aliases.get(raw).map(String::as_str)
    }
}

pub fn order_by_variants<V: Clone>(
    map: &OrderedMap<String, V>,
    order: &[String],
) -> (OrderedMap<String, V>, OrderedMap<String, V>) {
    let mut remainder = map.clone();
    let mut sorted = OrderedMap::new();
    for variant in order {
        if let Some(value) = remainder.shift_remove(variant) {
            sorted.insert(variant.clone(), value);
        }
    }
    (sorted, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aliases_cover_canonical_and_legacy_names() {
        let aliases = VariantAliases::default();
        assert_eq!(aliases.resolve("plain"), Some("plain"));
        assert_eq!(aliases.resolve("envoy"), Some("istio"));
        assert_eq!(aliases.resolve("filter"), Some("prose-filter"));
        assert_eq!(aliases.resolve("mystery"), None);
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides: OrderedMap<String, String> =
            OrderedMap::from_iter([("envoy".to_string(), "plain".to_string())]);
        let aliases = VariantAliases::default().with_overrides(overrides.iter());
        assert_eq!(aliases.resolve("envoy"), Some("plain"));
    }

    #[test]
    fn order_by_variants_returns_unordered_remainder() {
        let map: OrderedMap<String, u32> = OrderedMap::from_iter([
            ("prose-filter".to_string(), 3),
            ("custom".to_string(), 9),
            ("plain".to_string(), 1),
        ]);
        let order = vec!["plain".to_string(), "istio".to_string(), "prose-filter".to_string()];

        let (sorted, remainder) = order_by_variants(&map, &order);

        let sorted_keys: Vec<&String> = sorted.keys().collect();
        assert_eq!(sorted_keys, vec!["plain", "prose-filter"]);
        let remainder_keys: Vec<&String> = remainder.keys().collect();
        assert_eq!(remainder_keys, vec!["custom"]);
    }
}
