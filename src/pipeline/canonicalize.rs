use std::collections::BTreeSet;

use crate::error::PipelineResult;
use crate::pipeline::locate::LocatedFile;
use crate::variants::VariantAliases;

pub trait VariantKeyed {
    fn variant_mut(&mut self) -> &mut String;
}

impl VariantKeyed for LocatedFile {
    fn variant_mut(&mut self) -> &mut String {
        &mut self.variant
    }
}

/// Rewrites raw variant names to their canonical form.
///
/// Unknown names pass through unchanged and are recorded in `unknown`, which
/// stays borrowed until the adapter is dropped, so the set is only readable
/// once the stream has been consumed.
pub struct Canonicalize<'a, I> {
    inner: I,
    aliases: &'a VariantAliases,
    unknown: &'a mut BTreeSet<String>,
}

pub fn canonicalize<'a, I, T>(
    inner: I,
    aliases: &'a VariantAliases,
    unknown: &'a mut BTreeSet<String>,
) -> Canonicalize<'a, I>
where
    I: Iterator<Item = PipelineResult<T>>,
    T: VariantKeyed,
{
    Canonicalize {
        inner,
        aliases,
        unknown,
    }
}

impl<I, T> Iterator for Canonicalize<'_, I>
where
    I: Iterator<Item = PipelineResult<T>>,
    T: VariantKeyed,
{
    type Item = PipelineResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut item = match self.inner.next()? {
            Ok(item) => item,
            Err(err) => return Some(Err(err)),
        };

        let variant = item.variant_mut();
        match self.aliases.resolve(variant.as_str()) {
            Some(canonical) => {
                if canonical != variant.as_str() {
                    *variant = canonical.to_string();
                }
            }
            None => {
                if !self.unknown.contains(variant.as_str()) {
                    self.unknown.insert(variant.clone());
                }
            }
        }
        Some(Ok(item))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::pipeline::locate::ResultFile;

    fn located(variant: &str) -> PipelineResult<LocatedFile> {
        Ok(LocatedFile {
            variant: variant.to_string(),
            rate: "100".to_string(),
            file: ResultFile::Summary(PathBuf::from(format!("/data/{variant}/1.summary.json"))),
        })
    }

    #[test]
    fn maps_known_and_reports_unknown_after_consumption() {
        let aliases = VariantAliases::default();
        let mut unknown = BTreeSet::new();

        let variants: Vec<String> = canonicalize(
            vec![located("envoy"), located("legacy-x"), located("plain"), located("legacy-x")]
                .into_iter(),
            &aliases,
            &mut unknown,
        )
        .map(|item| item.expect("no errors").variant)
        .collect();

        assert_eq!(variants, vec!["istio", "legacy-x", "plain", "legacy-x"]);
        assert_eq!(unknown.into_iter().collect::<Vec<_>>(), vec!["legacy-x"]);
    }
}
