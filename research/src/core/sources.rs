//! Credibility bucketing for cited sources.

use crate::core::types::SourceAttribution;

/// Source URLs split by credibility, in citation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePartition {
    pub verified: Vec<String>,
    pub failed: Vec<String>,
}

/// Partition sources by `credibility_score >= threshold`.
///
/// Every source lands in exactly one bucket; duplicates are kept.
pub fn partition_sources<'a, I>(sources: I, threshold: f64) -> SourcePartition
where
    I: IntoIterator<Item = &'a SourceAttribution>,
{
    let mut partition = SourcePartition::default();
    for source in sources {
        if source.credibility_score >= threshold {
            partition.verified.push(source.url.clone());
        } else {
            partition.failed.push(source.url.clone());
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, credibility_score: f64) -> SourceAttribution {
        SourceAttribution {
            url: url.to_string(),
            domain: String::new(),
            credibility_score,
            content_snippet: String::new(),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let sources = [source("a", 70.0), source("b", 69.9), source("c", 95.0)];
        let partition = partition_sources(&sources, 70.0);
        assert_eq!(partition.verified, vec!["a", "c"]);
        assert_eq!(partition.failed, vec!["b"]);
    }

    #[test]
    fn keeps_duplicate_urls() {
        let sources = [source("a", 90.0), source("a", 90.0)];
        let partition = partition_sources(&sources, 70.0);
        assert_eq!(partition.verified.len(), 2);
        assert!(partition.failed.is_empty());
    }
}
