use crate::genome::Feature;

/// ContigWindow
///
/// Neighbour search over the features of a single contig.  The features must
/// be sorted on start coordinate (as they are in a Contig).
///
/// Features can be long and can overlap, so the feature immediately before
/// the current one is not necessarily the nearest.  Looking forward the start
/// coordinates give a hard limit; looking back we keep a running maximum of
/// end coordinates, which gives a limit on how far back a neighbour can be.
pub struct ContigWindow<'a> {
    features: &'a [Feature],
    max_end: Vec<usize>,
}

impl<'a> ContigWindow<'a> {
    pub fn new(features: &'a [Feature]) -> Self {
        debug_assert!(features.windows(2).all(|w| w[0].start() <= w[1].start()));
        let max_end = features
            .iter()
            .scan(0, |m, f| {
                *m = f.end().max(*m);
                Some(*m)
            })
            .collect();
        Self { features, max_end }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Indices of features after ix (in sorted order) that lie within gap of feature ix
    pub fn following(&self, ix: usize, gap: usize) -> impl Iterator<Item = usize> + '_ {
        let f = &self.features[ix];
        let limit = f.end().saturating_add(gap);
        self.features[ix + 1..]
            .iter()
            .take_while(move |g| g.start() <= limit)
            .enumerate()
            .map(move |(i, _)| ix + 1 + i)
    }

    /// Indices of features before ix (in sorted order) that lie within gap of feature ix
    pub fn preceding(&self, ix: usize, gap: usize) -> impl Iterator<Item = usize> + '_ {
        let f = &self.features[ix];
        (0..ix)
            .rev()
            .take_while(move |j| self.max_end[*j].saturating_add(gap) >= f.start())
            .filter(move |j| self.features[*j].distance(f) <= gap)
    }

    /// Indices of all other features within gap of feature ix, in sorted order
    pub fn neighbors(&self, ix: usize, gap: usize) -> Vec<usize> {
        let mut v: Vec<_> = self.preceding(ix, gap).collect();
        v.reverse();
        v.extend(self.following(ix, gap));
        v
    }
}
