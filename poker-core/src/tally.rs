use std::collections::HashMap;

use serde::Serialize;

use poker_types::CardValue;

/// Aggregated results for a revealed round.
///
/// Distribution groups raw values by literal card and is pre-sorted for
/// display (numeric ascending, then `?`, then anything else). The
/// average covers only values parseable as a finite number; `?` and `☕`
/// are excluded, not counted as zero. Consensus means exactly one
/// distinct value was cast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteTally {
    pub distribution: Vec<(CardValue, usize)>,
    pub average: Option<f64>,
    pub consensus: bool,
    pub total: usize,
}

impl VoteTally {
    pub fn from_votes<'a, I>(votes: I) -> Self
    where
        I: IntoIterator<Item = &'a CardValue>,
    {
        let mut counts: HashMap<CardValue, usize> = HashMap::new();
        let mut numeric = Vec::new();
        let mut total = 0;

        for vote in votes {
            *counts.entry(*vote).or_insert(0) += 1;
            total += 1;
            if let Some(n) = vote.as_number() {
                if n.is_finite() {
                    numeric.push(n);
                }
            }
        }

        let mut distribution: Vec<(CardValue, usize)> = counts.into_iter().collect();
        distribution.sort_by_key(|(card, _)| card.display_rank());

        let average = if numeric.is_empty() {
            None
        } else {
            Some(numeric.iter().sum::<f64>() / numeric.len() as f64)
        };

        Self {
            consensus: distribution.len() == 1,
            distribution,
            average,
            total,
        }
    }
}
