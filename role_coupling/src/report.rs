use std::io::Write;

use crate::{coupler::Coupler, tally::PairCount};

/// Minimum togetherness and count for a pair to be reported (or, for a
/// baseline, for a low togetherness to count as a disagreement)
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_togetherness: f64,
    pub min_count: usize,
}

impl Thresholds {
    pub fn new(min_togetherness: f64, min_count: usize) -> Self {
        Self {
            min_togetherness,
            min_count,
        }
    }
}

/// What the baseline data say about a reported pair
///
/// fraction - togetherness in the baseline
/// pair_count - number of times the pair was seen in the baseline
/// other_count - occurrences of either role in the baseline without the other
/// failure - baseline has enough data and its togetherness is below threshold
#[derive(Debug, Clone)]
pub struct BaselineData {
    pub fraction: f64,
    pub pair_count: usize,
    pub other_count: usize,
    pub failure: bool,
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub pair: PairCount,
    pub baseline: Option<BaselineData>,
}

/// Pairs from the coupler that pass the thresholds, highest count first
pub fn report(c: &Coupler, thresholds: Thresholds) -> Vec<ReportRow> {
    c.sorted_pairs(thresholds.min_togetherness, thresholds.min_count)
        .into_iter()
        .map(|pair| ReportRow {
            pair,
            baseline: None,
        })
        .collect()
}

/// Check the pairs reported from primary against a baseline.
///
/// If neither role of a pair appears in the baseline there is nothing to
/// compare and the row has no baseline data.  Otherwise the row is flagged
/// as a failure if the roles appear at least baseline_thresholds.min_count
/// times in the baseline but with a togetherness below
/// baseline_thresholds.min_togetherness.
pub fn compare(
    primary: &Coupler,
    thresholds: Thresholds,
    baseline: &Coupler,
    baseline_thresholds: Thresholds,
) -> Vec<ReportRow> {
    let mut rows = report(primary, thresholds);
    for row in rows.iter_mut() {
        let (a, b) = (&row.pair.role1, &row.pair.role2);
        let appearances = baseline.occurrence_count(a) + baseline.occurrence_count(b);
        if appearances > 0 {
            let fraction = baseline.togetherness(a, b);
            let pair_count = baseline.pair_count(a, b);
            row.baseline = Some(BaselineData {
                fraction,
                pair_count,
                other_count: appearances.saturating_sub(pair_count),
                failure: fraction < baseline_thresholds.min_togetherness
                    && appearances >= baseline_thresholds.min_count,
            })
        }
    }
    rows
}

/// Number of rows reported, rows with baseline data, and failures
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub n_pairs: usize,
    pub n_compared: usize,
    pub n_failures: usize,
}

/// Write report rows as a tab separated table.  The baseline columns are
/// only present if with_baseline is set.
pub fn write_report<W: Write>(
    rows: &[ReportRow],
    with_baseline: bool,
    wrt: &mut W,
) -> anyhow::Result<ReportSummary> {
    let mut summary = ReportSummary::default();
    write!(wrt, "role_id1\trole_id2\tfraction\tcount")?;
    if with_baseline {
        write!(wrt, "\totherFrac\totherCount\totherFound\tfailure")?;
    }
    writeln!(wrt)?;

    for row in rows {
        let p = &row.pair;
        summary.n_pairs += 1;
        write!(
            wrt,
            "{}\t{}\t{:.3}\t{}",
            p.role1.id(),
            p.role2.id(),
            p.togetherness,
            p.count
        )?;
        if let Some(b) = row.baseline.as_ref() {
            summary.n_compared += 1;
            if b.failure {
                summary.n_failures += 1
            }
            write!(
                wrt,
                "\t{:.3}\t{}\t{}\t{}",
                b.fraction,
                b.pair_count,
                b.other_count,
                if b.failure { "Y" } else { "" }
            )?;
        }
        writeln!(wrt)?;
    }
    Ok(summary)
}
