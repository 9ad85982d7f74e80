use std::collections::HashMap;

use crate::{loader::SourceLoader, MixerError, Result, Source};

/// Registry of loaded sources, keyed by the name cue sheets refer to them by.
#[derive(Debug, Default)]
pub struct SourceBank {
    sources: HashMap<String, Source>,
}

impl SourceBank {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, source: Source) {
        self.sources.insert(name.into(), source);
    }

    /// Loads every `(name, identifier)` pair through `loader`, stopping at the
    /// first failure.
    pub fn load_all<'a, L, I>(&mut self, loader: &L, entries: I) -> Result<()>
    where
        L: SourceLoader + ?Sized,
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, identifier) in entries {
            let source = loader.load(identifier)?;
            self.register(name, source);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Source> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| MixerError::UnknownSource(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLoader;

    impl SourceLoader for FixedLoader {
        fn load(&self, identifier: &str) -> Result<Source> {
            match identifier {
                "short" => Source::from_samples(vec![1_i16, 1]),
                "long" => Source::from_samples(vec![2_i16; 8]),
                other => Err(MixerError::msg(format!("cannot load {other}"))),
            }
        }
    }

    #[test]
    fn resolves_registered_sources() {
        let mut bank = SourceBank::new();
        bank.load_all(&FixedLoader, [("a", "short"), ("b", "long")]).unwrap();

        assert_eq!(bank.len(), 2);
        assert_eq!(bank.resolve("b").unwrap().len(), 8);
    }

    #[test]
    fn errors_on_missing_sources() {
        let bank = SourceBank::new();
        let err = bank.resolve("missing").unwrap_err();
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn load_failure_propagates() {
        let mut bank = SourceBank::new();
        let err = bank
            .load_all(&FixedLoader, [("a", "short"), ("x", "nope")])
            .unwrap_err();
        assert!(format!("{err}").contains("nope"));
        assert!(bank.get("a").is_some());
    }
}
