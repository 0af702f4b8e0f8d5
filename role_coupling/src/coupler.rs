use crate::{
    annotation::parse_roles,
    error::CouplingError,
    genome::Genome,
    role::{Role, Vocabulary},
    tally::{CouplingTally, PairCount, RoleCount},
    window::ContigWindow,
};

/// Coupler
///
/// A role coupling counter: the roles of interest, the maximum distance for
/// two features to be neighbours, and the counts accumulated so far.  This
/// is the unit that is saved to and loaded from a coupling database.
#[derive(Debug, Clone)]
pub struct Coupler {
    vocabulary: Vocabulary,
    gap: usize,
    tally: CouplingTally,
}

impl Coupler {
    pub fn new(vocabulary: Vocabulary, gap: usize) -> Self {
        Self {
            vocabulary,
            gap,
            tally: CouplingTally::new(),
        }
    }

    pub fn set_self_pairs(&mut self, x: bool) {
        self.tally.set_self_pairs(x)
    }

    /// Whether a role found next to itself is counted as a pair
    pub fn self_pairs(&self) -> bool {
        self.tally.self_pairs()
    }

    pub fn gap(&self) -> usize {
        self.gap
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn tally(&self) -> &CouplingTally {
        &self.tally
    }

    pub(crate) fn tally_mut(&mut self) -> &mut CouplingTally {
        &mut self.tally
    }

    pub(crate) fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocabulary
    }

    pub fn get_role(&self, id: &str) -> Option<&Role> {
        self.vocabulary.get(id)
    }

    pub fn occurrence_count(&self, role: &Role) -> usize {
        self.tally.occurrence_count(role)
    }

    pub fn pair_count(&self, a: &Role, b: &Role) -> usize {
        self.tally.pair_count(a, b)
    }

    pub fn togetherness(&self, a: &Role, b: &Role) -> f64 {
        self.tally.togetherness(a, b)
    }

    pub fn sorted_pairs(&self, min_togetherness: f64, min_count: usize) -> Vec<PairCount> {
        self.tally.sorted_pairs(min_togetherness, min_count)
    }

    /// Count the couplings in a genome.
    ///
    /// Features are visited in position order along each contig.  For each
    /// feature with recognized roles, the roles of the neighbours that follow
    /// it are paired with its own roles, so every pair of neighbouring
    /// features is counted once.
    pub fn count_couplings(&mut self, genome: &Genome) {
        for ctg in genome.contigs() {
            let features = ctg.features();
            let roles: Vec<Vec<Role>> = features
                .iter()
                .map(|f| parse_roles(f.function(), &self.vocabulary))
                .collect();
            let window = ContigWindow::new(features);
            let mut n_scanned = 0;
            for (ix, focus) in roles.iter().enumerate() {
                if !focus.is_empty() {
                    let neighbors = window
                        .following(ix, self.gap)
                        .flat_map(|j| roles[j].iter());
                    self.tally.record_scan(focus, neighbors);
                    n_scanned += 1;
                }
            }
            trace!(
                "Genome {} contig {}: {} of {} features with useful roles",
                genome.id(),
                ctg.name(),
                n_scanned,
                features.len()
            );
        }
    }

    /// Every role in the vocabulary with its count (including zero counts),
    /// highest first.  Ties are broken on role id
    pub fn role_counts(&self) -> Vec<RoleCount> {
        let mut v: Vec<_> = self
            .vocabulary
            .roles()
            .map(|r| RoleCount {
                role: r.clone(),
                count: self.tally.occurrence_count(r),
            })
            .collect();
        v.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.role.cmp(&b.role)));
        v
    }

    /// Fold the counts from another coupler into this one.  Both must have been
    /// built with the same gap and self pair setting.  Roles only known to
    /// other are added.
    pub fn merge(&mut self, other: &Coupler) -> Result<(), CouplingError> {
        if self.gap != other.gap {
            return Err(CouplingError::Configuration(format!(
                "Cannot merge coupling data built with gap {} into data built with gap {}",
                other.gap, self.gap
            )));
        }
        if self.self_pairs() != other.self_pairs() {
            return Err(CouplingError::Configuration(format!(
                "Cannot merge coupling data with self pairs {} into data with self pairs {}",
                on_off(other.self_pairs()),
                on_off(self.self_pairs())
            )));
        }
        self.vocabulary.merge(&other.vocabulary);
        // Counts for roles that could not be added to the vocabulary are dropped
        let voc = &self.vocabulary;
        self.tally
            .merge_where(&other.tally, |r| voc.get(r.id()).is_some());
        Ok(())
    }
}

fn on_off(x: bool) -> &'static str {
    if x {
        "on"
    } else {
        "off"
    }
}
