// Weighted selection over a keyed weight table.
//
// `WeightedSelector<K>` maps keys to non-negative weights and carries a
// designated default key. It backs every "pick one of these, proportionally"
// decision in the generator: which builder wins a plot, which stone paves a
// road, which crop fills an acre. When the table is empty or every weight is
// zero, all draws resolve to the default rather than failing.
//
// Keys live in a `BTreeMap`, so iteration order is the keys' `Ord` order.
// That order is the tie-break rule for `most_common`/`least_common` (the
// smallest tied key wins) and the order of the cumulative distribution that
// `random` walks, which keeps seeded draws reproducible.
//
// `least_common` only considers keys with a positive weight: a key stored
// with weight zero is treated as absent for extremal queries.
//
// See also: `hamlet_prng::SiteRng::weighted_index` for the sampler itself,
// `auction.rs` which draws builders by interest, `site.rs` for the material
// tables handed to builders.

use crate::prng::SiteRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A key -> weight table with a fallback key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "SelectorRepr<K>")]
#[serde(bound(deserialize = "K: Ord + Deserialize<'de>"))]
pub struct WeightedSelector<K: Ord> {
    default: K,
    weights: BTreeMap<K, f64>,
}

/// On-disk form of a table. Loaded weights go through `insert`.
#[derive(Deserialize)]
#[serde(bound(deserialize = "K: Ord + Deserialize<'de>"))]
struct SelectorRepr<K: Ord> {
    default: K,
    #[serde(default = "BTreeMap::new")]
    weights: BTreeMap<K, f64>,
}

impl<K: Ord> From<SelectorRepr<K>> for WeightedSelector<K> {
    fn from(repr: SelectorRepr<K>) -> Self {
        WeightedSelector::from_weights(repr.default, repr.weights)
    }
}

impl<K: Ord> WeightedSelector<K> {
    /// An empty table; every draw returns `default` until weights are added.
    pub fn new(default: K) -> Self {
        Self {
            default,
            weights: BTreeMap::new(),
        }
    }

    pub fn from_weights(default: K, weights: impl IntoIterator<Item = (K, f64)>) -> Self {
        let mut selector = Self::new(default);
        for (key, weight) in weights {
            selector.insert(key, weight);
        }
        selector
    }

    /// Set the weight of `key`. Negative and non-finite weights are stored
    /// as zero.
    pub fn insert(&mut self, key: K, weight: f64) {
        self.weights.insert(key, sanitize(weight));
    }

    /// Add `amount` to the weight of `key` (histogram-style counting).
    pub fn add(&mut self, key: K, amount: f64) {
        let entry = self.weights.entry(key).or_insert(0.0);
        *entry = sanitize(*entry + amount);
    }

    pub fn default_key(&self) -> &K {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// The stored (unnormalized) weight of `key`, 0 if absent.
    pub fn raw_weight(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    /// The normalized weight of `key`: its share of the total, 0 if absent
    /// or if the table has no positive weight.
    pub fn weight(&self, key: &K) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.raw_weight(key) / total
        } else {
            0.0
        }
    }

    /// `(key, normalized weight)` for every stored key, in key order.
    pub fn weighted_items(&self) -> impl Iterator<Item = (&K, f64)> {
        let total = self.total();
        self.weights.iter().map(move |(k, &w)| {
            let share = if total > 0.0 { w / total } else { 0.0 };
            (k, share)
        })
    }

    pub fn is_non_zero(&self, key: &K) -> bool {
        self.raw_weight(key) > 0.0
    }

    pub fn has_non_zero(&self) -> bool {
        self.weights.values().any(|&w| w > 0.0)
    }

    /// Draw a key with probability proportional to its weight.
    ///
    /// Consumes exactly one draw from `rng` when some weight is positive and
    /// none otherwise (the default is returned).
    pub fn random(&self, rng: &mut SiteRng) -> &K {
        let weights: Vec<f64> = self.weights.values().copied().collect();
        match rng.weighted_index(&weights) {
            Some(i) => self.weights.keys().nth(i).unwrap_or(&self.default),
            None => &self.default,
        }
    }

    /// A key with the maximum weight; the smallest such key on ties.
    pub fn most_common(&self) -> &K {
        self.extremal(|candidate, best| candidate > best)
    }

    /// A key with the minimum positive weight; the smallest such key on ties.
    pub fn least_common(&self) -> &K {
        self.extremal(|candidate, best| candidate < best)
    }

    fn extremal(&self, better: impl Fn(f64, f64) -> bool) -> &K {
        let mut best: Option<(&K, f64)> = None;
        for (key, &w) in &self.weights {
            if w <= 0.0 {
                continue;
            }
            match best {
                Some((_, bw)) if !better(w, bw) => {}
                _ => best = Some((key, w)),
            }
        }
        best.map_or(&self.default, |(key, _)| key)
    }
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 { weight } else { 0.0 }
}
