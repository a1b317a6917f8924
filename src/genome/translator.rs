//! Resolution of free-form sequence names to genome chromosomes.

use std::collections::HashMap;

/// A chromosome reference plus the offset to add to coordinates quoted
/// against the name it was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromosomeWithOffset {
    pub index: usize,
    pub offset: i64,
}

impl ChromosomeWithOffset {
    /// Translates a position given against the resolved name into chromosome
    /// coordinates, or `None` if the shifted position overflows.
    #[must_use]
    pub fn position(&self, position: i64) -> Option<i64> {
        position.checked_add(self.offset)
    }
}

/// Maps user-supplied sequence names onto chromosomes.
///
/// Results are memoized per input name. Explicit aliases always take
/// precedence over the name heuristics.
#[derive(Debug, Default)]
pub struct NameTranslator {
    resolved: HashMap<String, Option<ChromosomeWithOffset>>,
    aliases: HashMap<String, ChromosomeWithOffset>,
}

impl NameTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias`. Re-registering an alias replaces the previous mapping.
    pub fn add_alias(&mut self, alias: &str, target: ChromosomeWithOffset) {
        self.aliases.insert(alias.to_string(), target);
        self.resolved.insert(alias.to_string(), Some(target));
    }

    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Resolves `name` using `exact` to look up chromosomes by their real name.
    ///
    /// Tried in order: a memoized answer, the chromosome token of an Ensembl
    /// style file name (`Species.Assembly.NN.dna.chromosome.1.fa`), the name with
    /// `.txt`/`.fa` suffixes and `chromosome`/`chr` prefixes removed (as is, then
    /// upper and lower case), and finally the first whitespace-delimited token.
    /// With `remember_failures`, a failed lookup is memoized too.
    pub fn resolve<F>(
        &mut self,
        name: &str,
        exact: F,
        remember_failures: bool,
    ) -> Option<ChromosomeWithOffset>
    where
        F: Fn(&str) -> Option<usize>,
    {
        if let Some(known) = self.resolved.get(name) {
            return *known;
        }

        let found = Self::guess(name, &exact).map(|index| ChromosomeWithOffset { index, offset: 0 });
        if found.is_some() || remember_failures {
            self.resolved.insert(name.to_string(), found);
        }
        found
    }

    fn guess<F>(name: &str, exact: &F) -> Option<usize>
    where
        F: Fn(&str) -> Option<usize>,
    {
        let dot_sections: Vec<&str> = name.split('.').collect();
        if dot_sections.len() == 7
            && let Some(index) = exact(dot_sections[5])
        {
            return Some(index);
        }

        let mut stem = name.trim();
        stem = strip_suffix_ignore_case(stem, ".txt");
        stem = strip_suffix_ignore_case(stem, ".fa");
        stem = strip_prefix_ignore_case(stem, "chromosome");
        stem = strip_prefix_ignore_case(stem, "chr");
        let stem = stem.trim();

        exact(stem)
            .or_else(|| exact(&stem.to_uppercase()))
            .or_else(|| exact(&stem.to_lowercase()))
            .or_else(|| name.split_whitespace().next().and_then(exact))
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> &'a str {
    if s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &s[..s.len() - suffix.len()]
    } else {
        s
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        &s[prefix.len()..]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(name: &str) -> Option<usize> {
        match name {
            "1" => Some(0),
            "X" => Some(1),
            "chrM" => Some(2),
            _ => None,
        }
    }

    #[test]
    fn prefixes_and_suffixes() {
        let mut translator = NameTranslator::new();
        assert_eq!(translator.resolve("chr1", exact, true).unwrap().index, 0);
        assert_eq!(translator.resolve("Chromosome1.fa", exact, true).unwrap().index, 0);
        assert_eq!(translator.resolve("chrx", exact, true).unwrap().index, 1);
    }

    #[test]
    fn ensembl_file_name() {
        let mut translator = NameTranslator::new();
        let found = translator.resolve("Homo_sapiens.GRCh37.55.dna.chromosome.X.fa", exact, true);
        assert_eq!(found.unwrap().index, 1);
    }

    #[test]
    fn first_token_fallback() {
        let mut translator = NameTranslator::new();
        assert_eq!(translator.resolve("chrM extra words", exact, true).unwrap().index, 2);
    }

    #[test]
    fn failures_remembered_on_request() {
        let mut translator = NameTranslator::new();
        assert!(translator.resolve("scaffold_9", exact, false).is_none());
        // Not memoized, so a later match would still be found.
        assert!(translator.resolve("scaffold_9", |_| Some(7), false).is_some());

        assert!(translator.resolve("scaffold_10", exact, true).is_none());
        assert!(translator.resolve("scaffold_10", |_| Some(7), true).is_none());
    }

    #[test]
    fn alias_wins_and_is_idempotent() {
        let mut translator = NameTranslator::new();
        let target = ChromosomeWithOffset { index: 1, offset: 100 };
        translator.add_alias("chr1", target);
        translator.add_alias("chr1", target);
        assert_eq!(translator.alias_count(), 1);
        let found = translator.resolve("chr1", exact, true).unwrap();
        assert_eq!(found, target);
        assert_eq!(found.position(5), Some(105));
    }
}
