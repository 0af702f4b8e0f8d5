use std::collections::{hash_map::Entry, HashMap};

use crate::role::Role;

/// Counts for a single role
#[derive(Debug, Clone)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

/// Counts for a pair of roles.  role1 always has the smaller id.
#[derive(Debug, Clone)]
pub struct PairCount {
    pub role1: Role,
    pub role2: Role,
    pub count: usize,
    pub togetherness: f64,
}

/// CouplingTally
///
/// occurrences - number of scanned features carrying each role
/// pairs - number of neighbour relationships seen between two roles.  The key
///         is ordered so that (a, b) and (b, a) share a counter
/// self_pairs - whether a role found next to itself is counted as a pair
///
/// Counts only ever go up.  Tallies from separate runs can be combined with
/// merge(), which simply adds the counts.
#[derive(Debug, Default, Clone)]
pub struct CouplingTally {
    occurrences: HashMap<Role, usize>,
    pairs: HashMap<(Role, Role), usize>,
    self_pairs: bool,
}

fn pair_key(a: &Role, b: &Role) -> (Role, Role) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl CouplingTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_self_pairs(&mut self, x: bool) {
        self.self_pairs = x
    }

    pub fn self_pairs(&self) -> bool {
        self.self_pairs
    }

    /// Record one scanned feature.  Each focus role gets one occurrence, and
    /// each (focus role, neighbour role) combination gets one pairing.
    /// Neighbour roles are a multiset, so a role found on two neighbours
    /// counts twice.
    pub fn record_scan<'a, I>(&mut self, focus: &[Role], neighbors: I)
    where
        I: IntoIterator<Item = &'a Role>,
    {
        if focus.is_empty() {
            return;
        }
        for r in focus {
            self.add_occurrences(r, 1)
        }
        for n in neighbors {
            for r in focus {
                if self.self_pairs || r != n {
                    self.add_pairing(r, n, 1)
                }
            }
        }
    }

    pub fn add_occurrences(&mut self, role: &Role, n: usize) {
        match self.occurrences.entry(role.clone()) {
            Entry::Occupied(mut e) => *e.get_mut() += n,
            Entry::Vacant(e) => {
                e.insert(n);
            }
        }
    }

    pub fn add_pairing(&mut self, a: &Role, b: &Role, n: usize) {
        *self.pairs.entry(pair_key(a, b)).or_insert(0) += n
    }

    pub fn occurrence_count(&self, role: &Role) -> usize {
        self.occurrences.get(role).copied().unwrap_or(0)
    }

    pub fn pair_count(&self, a: &Role, b: &Role) -> usize {
        self.pairs.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    /// Fraction of the occurrences of either role that were found together:
    ///
    ///   pair(a, b) / (occurrence(a) + occurrence(b) - pair(a, b))
    ///
    /// Returns 0 for a pair that was never seen or if the denominator is 0,
    /// and is capped at 1
    pub fn togetherness(&self, a: &Role, b: &Role) -> f64 {
        match self.pairs.get(&pair_key(a, b)) {
            Some(p) => self.fraction(a, b, *p),
            None => 0.0,
        }
    }

    fn fraction(&self, a: &Role, b: &Role, p: usize) -> f64 {
        let total = self.occurrence_count(a) + self.occurrence_count(b);
        // A role can be seen on several neighbours of one feature, so p can
        // exceed the smaller occurrence count or even the total
        if p == 0 || total == p {
            0.0
        } else if total < p {
            1.0
        } else {
            ((p as f64) / ((total - p) as f64)).min(1.0)
        }
    }

    /// Number of roles with an occurrence count
    pub fn n_roles(&self) -> usize {
        self.occurrences.len()
    }

    /// Number of distinct pairs recorded
    pub fn n_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Role counts, highest first.  Ties are broken on role id
    pub fn sorted_occurrences(&self) -> Vec<RoleCount> {
        let mut v: Vec<_> = self
            .occurrences
            .iter()
            .map(|(role, count)| RoleCount {
                role: role.clone(),
                count: *count,
            })
            .collect();
        v.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.role.cmp(&b.role)));
        v
    }

    /// Pairs with at least min_count pairings and a togetherness of at least
    /// min_togetherness, highest count first.  Ties are broken on the role ids
    pub fn sorted_pairs(&self, min_togetherness: f64, min_count: usize) -> Vec<PairCount> {
        let mut v: Vec<_> = self
            .pairs
            .iter()
            .filter(|(_, count)| **count >= min_count)
            .map(|((a, b), count)| PairCount {
                role1: a.clone(),
                role2: b.clone(),
                count: *count,
                togetherness: self.fraction(a, b, *count),
            })
            .filter(|p| p.togetherness >= min_togetherness)
            .collect();
        v.sort_unstable_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.role1.cmp(&b.role1))
                .then_with(|| a.role2.cmp(&b.role2))
        });
        v
    }

    /// Add all counts from other to self
    pub fn merge(&mut self, other: &CouplingTally) {
        self.merge_where(other, |_| true)
    }

    /// Add counts from other to self, skipping any occurrence or pair
    /// involving a role for which keep returns false
    pub fn merge_where<F: Fn(&Role) -> bool>(&mut self, other: &CouplingTally, keep: F) {
        for (role, n) in other.occurrences.iter().filter(|(r, _)| keep(r)) {
            self.add_occurrences(role, *n)
        }
        for ((a, b), n) in other.pairs.iter() {
            if keep(a) && keep(b) {
                self.add_pairing(a, b, *n)
            }
        }
    }
}
