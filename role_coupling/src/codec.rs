//! Coupling database file format
//!
//! A tab separated text file so that it can be easily used from other tools:
//!
//! ```text
//! <gap>	Role-Coupling Database[	self-pairs]
//! count	role_id	role_name
//! <count>	<role id>	<role name>                       one per role, highest count first
//! role1_id	role2_id	count	togetherness
//! <role1 id>	<role2 id>	<count>	<togetherness>   one per pair, highest count first
//! ```
//!
//! The togetherness column is for information only.  It is ignored on input
//! and recalculated from the counts.  The `self-pairs` marker is present when
//! roles found next to themselves were counted.
//!
//! Older files have `%n` at the end of the role table header and put the
//! count first on the pair rows.
use std::{
    ffi::OsString,
    fs,
    io::{BufRead, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::{get_next_line, parse_field};

use crate::{coupler::Coupler, error::CouplingError, role::Role, role::Vocabulary};

const TITLE: &str = "Role-Coupling Database";
const SELF_PAIRS: &str = "self-pairs";
const LEGACY_MARK: &str = "%n";

pub fn write_coupler<W: Write>(c: &Coupler, wrt: &mut W) -> anyhow::Result<()> {
    write!(wrt, "{}\t{}", c.gap(), TITLE)?;
    if c.self_pairs() {
        write!(wrt, "\t{}", SELF_PAIRS)?;
    }
    writeln!(wrt)?;
    writeln!(wrt, "count\trole_id\trole_name")?;
    for rc in c.role_counts() {
        writeln!(wrt, "{}\t{}\t{}", rc.count, rc.role.id(), rc.role.name())?
    }
    writeln!(wrt, "role1_id\trole2_id\tcount\ttogetherness")?;
    for p in c.sorted_pairs(0.0, 0) {
        writeln!(
            wrt,
            "{}\t{}\t{}\t{:.3}",
            p.role1.id(),
            p.role2.id(),
            p.count,
            p.togetherness
        )?
    }
    Ok(())
}

fn corrupt(desc: &str, line: usize, e: anyhow::Error) -> CouplingError {
    CouplingError::CorruptState(format!("{}:{} {:#}", desc, line, e))
}

enum Section {
    Roles,
    Pairs,
}

/// Column order of the pair rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairLayout {
    /// role1, role2, count, togetherness
    Current,
    /// count, role1, role2, togetherness
    Legacy,
}

pub fn read_coupler<R: BufRead>(mut rdr: R, desc: &str) -> anyhow::Result<Coupler> {
    let mut buf = String::new();
    let mut line = 0;

    // Title line with the gap and counting options
    let (gap, self_pairs) = match get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error reading from {}", desc))?
    {
        Some(fields) => {
            line += 1;
            let gap =
                parse_field::<usize>(&fields, 0, "gap").map_err(|e| corrupt(desc, line, e))?;
            let self_pairs = match fields.get(2).copied() {
                None | Some("") => false,
                Some(SELF_PAIRS) => true,
                Some(s) => {
                    return Err(corrupt(desc, line, anyhow!("Unknown option {}", s)).into())
                }
            };
            (gap, self_pairs)
        }
        None => {
            return Err(CouplingError::CorruptState(format!("{} is empty", desc)).into());
        }
    };
    trace!("{}: gap = {}, self pairs = {}", desc, gap, self_pairs);
    let mut coupler = Coupler::new(Vocabulary::new(), gap);
    coupler.set_self_pairs(self_pairs);

    // Role table header, which also tells us the pair row layout
    let layout = match get_next_line(&mut rdr, &mut buf)? {
        Some(fields) if fields.last().is_some_and(|s| s.ends_with(LEGACY_MARK)) => {
            PairLayout::Legacy
        }
        Some(_) => PairLayout::Current,
        None => {
            return Err(
                CouplingError::CorruptState(format!("{}: missing role table", desc)).into(),
            );
        }
    };
    line += 1;
    trace!("{}: pair layout {:?}", desc, layout);

    let mut section = Section::Roles;
    while let Some(fields) = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, desc))?
    {
        line += 1;
        if fields.len() == 1 && fields[0].is_empty() {
            continue;
        }
        match section {
            Section::Roles => {
                // The role table ends at the first line that does not start with a count
                let Ok(count) = fields[0].parse::<usize>() else {
                    trace!("{}:{} start of pair table", desc, line);
                    section = Section::Pairs;
                    continue;
                };
                let id = fields
                    .get(1)
                    .copied()
                    .ok_or_else(|| corrupt(desc, line, anyhow!("Missing role id")))?;
                let role = Role::new(id, fields.get(2).copied().unwrap_or(""));
                if !coupler.vocabulary_mut().insert(role.clone()) {
                    return Err(corrupt(desc, line, anyhow!("Duplicate role {}", id)).into());
                }
                if count > 0 {
                    coupler.tally_mut().add_occurrences(&role, count)
                }
            }
            Section::Pairs => {
                if fields.len() < 3 {
                    return Err(corrupt(desc, line, anyhow!("Short pair line")).into());
                }
                let (id1, id2, count_ix) = match layout {
                    PairLayout::Current => (fields[0], fields[1], 2),
                    PairLayout::Legacy => (fields[1], fields[2], 0),
                };
                let count = parse_field::<usize>(&fields, count_ix, "pair count")
                    .map_err(|e| corrupt(desc, line, e))?;
                let r1 = get_role_by_id(&coupler, id1, line)?;
                let r2 = get_role_by_id(&coupler, id2, line)?;
                coupler.tally_mut().add_pairing(&r1, &r2, count)
            }
        }
    }

    debug!(
        "Read {} roles and {} pairs from {}",
        coupler.vocabulary().len(),
        coupler.tally().n_pairs(),
        desc
    );
    Ok(coupler)
}

fn get_role_by_id(c: &Coupler, id: &str, line: usize) -> Result<Role, CouplingError> {
    c.get_role(id)
        .cloned()
        .ok_or_else(|| CouplingError::UnknownRole {
            role_id: id.to_owned(),
            line,
        })
}

/// Read a coupling database from a (possibly compressed) file
pub fn load_coupler<P: AsRef<Path>>(fname: P) -> anyhow::Result<Coupler> {
    let desc = fname.as_ref().display().to_string();
    debug!("Loading coupling database from {}", desc);
    let rdr = CompressIo::new()
        .path(&fname)
        .bufreader()
        .with_context(|| format!("Error opening coupling database {}", desc))?;
    read_coupler(rdr, &desc).with_context(|| format!("Error loading coupling database {}", desc))
}

fn tmp_path(p: &Path) -> PathBuf {
    let mut s = OsString::from(p.as_os_str());
    s.push(".tmp");
    PathBuf::from(s)
}

/// Write a coupling database to file.  The data are written to a temporary
/// file which then replaces the target, so an existing database is never
/// left half written.
pub fn save_coupler<P: AsRef<Path>>(c: &Coupler, fname: P) -> anyhow::Result<()> {
    let path = fname.as_ref();
    let tmp = tmp_path(path);
    debug!("Saving coupling database to {}", path.display());

    let res = fs::File::create(&tmp)
        .with_context(|| format!("problem creating output file {}", tmp.display()))
        .and_then(|f| {
            let mut wrt = BufWriter::new(f);
            write_coupler(c, &mut wrt)?;
            wrt.flush()?;
            Ok(())
        });
    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(e.context(format!("Error writing coupling database {}", path.display())));
    }
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "Could not move {} to {}",
            tmp.display(),
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupler::tests::{test_genome, test_vocabulary};
    use std::io::Cursor;

    fn test_coupler() -> Coupler {
        let mut c = Coupler::new(test_vocabulary(), 100);
        c.count_couplings(&test_genome());
        c.count_couplings(&test_genome());
        c
    }

    fn round_trip(c: &Coupler) -> Coupler {
        let mut v = Vec::new();
        write_coupler(c, &mut v).unwrap();
        read_coupler(Cursor::new(v), "test").unwrap()
    }

    fn assert_same_counts(a: &Coupler, b: &Coupler) {
        assert_eq!(a.gap(), b.gap());
        assert_eq!(a.vocabulary().len(), b.vocabulary().len());
        for r in a.vocabulary().roles() {
            let r1 = b.get_role(r.id()).unwrap();
            assert_eq!(r1.name(), r.name());
            assert_eq!(a.occurrence_count(r), b.occurrence_count(r1));
        }
        let pa = a.sorted_pairs(0.0, 0);
        let pb = b.sorted_pairs(0.0, 0);
        assert_eq!(pa.len(), pb.len());
        for p in pa {
            assert_eq!(p.count, b.pair_count(&p.role1, &p.role2));
            assert!((p.togetherness - b.togetherness(&p.role1, &p.role2)).abs() < 1e-12);
        }
    }

    #[test]
    fn write_format() {
        let mut voc = Vocabulary::new();
        voc.insert(Role::new("R1", "Role 1"));
        voc.insert(Role::new("R2", "Role 2"));
        let mut c = Coupler::new(voc, 250);
        let r1 = c.get_role("R1").unwrap().clone();
        let r2 = c.get_role("R2").unwrap().clone();
        c.tally_mut().record_scan(&[r2.clone()], [&r1]);
        c.tally_mut().record_scan(&[r2.clone()], &Vec::<Role>::new());
        let mut v = Vec::new();
        write_coupler(&c, &mut v).unwrap();
        assert_eq!(
            String::from_utf8(v).unwrap(),
            "250\tRole-Coupling Database\n\
             count\trole_id\trole_name\n\
             2\tR2\tRole 2\n\
             0\tR1\tRole 1\n\
             role1_id\trole2_id\tcount\ttogetherness\n\
             R1\tR2\t1\t1.000\n"
        );
    }

    #[test]
    fn round_trip_keeps_counts() {
        let c = test_coupler();
        let c1 = round_trip(&c);
        assert_same_counts(&c, &c1);
        // And again
        assert_same_counts(&c, &round_trip(&c1));
    }

    #[test]
    fn stored_togetherness_is_ignored() {
        let data = "500\tRole-Coupling Database\n\
                    count\trole_id\trole_name\n\
                    4\tA\tAlpha\n\
                    2\tB\tBeta\n\
                    role1_id\trole2_id\tcount\ttogetherness\n\
                    A\tB\t2\t0.123\n";
        let c = read_coupler(Cursor::new(data), "test").unwrap();
        assert_eq!(c.gap(), 500);
        let a = c.get_role("A").unwrap();
        let b = c.get_role("B").unwrap();
        assert_eq!(c.pair_count(b, a), 2);
        assert!((c.togetherness(a, b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn legacy_pair_layout() {
        let data = "100\tRole-Coupling Database\n\
                    count\trole_id\trole_name%n\n\
                    3\tRole1n1\tRole 1\n\
                    3\tRole2n1\tRole 2\n\
                    role1_id\trole2_id\tcount\ttogetherness\n\
                    2\tRole1n1\tRole2n1\t0.50\n";
        let c = read_coupler(Cursor::new(data), "test").unwrap();
        let a = c.get_role("Role1n1").unwrap();
        let b = c.get_role("Role2n1").unwrap();
        assert_eq!(c.pair_count(a, b), 2);
    }

    #[test]
    fn numeric_role_ids() {
        // Pair rows are read in the layout given by the role table header,
        // even when the role ids look like counts
        let current = "100\tRole-Coupling Database\n\
                       count\trole_id\trole_name\n\
                       3\t7\tRole 7\n\
                       3\t8\tRole 8\n\
                       role1_id\trole2_id\tcount\ttogetherness\n\
                       7\t8\t2\t0.50\n";
        let legacy = "100\tRole-Coupling Database\n\
                      count\trole_id\trole_name%n\n\
                      3\t7\tRole 7\n\
                      3\t8\tRole 8\n\
                      role1_id\trole2_id\tcount\ttogetherness\n\
                      2\t7\t8\t0.50\n";
        for data in [current, legacy] {
            let c = read_coupler(Cursor::new(data), "test").unwrap();
            let a = c.get_role("7").unwrap();
            let b = c.get_role("8").unwrap();
            assert_eq!(c.pair_count(a, b), 2);
            assert_eq!(c.tally().n_pairs(), 1);
        }
    }

    #[test]
    fn self_pairs_setting_is_kept() {
        let mut voc = Vocabulary::new();
        voc.insert(Role::new("R1", "Role 1"));
        let mut c = Coupler::new(voc, 0);
        c.set_self_pairs(true);
        let r = c.get_role("R1").unwrap().clone();
        c.tally_mut().record_scan(&[r.clone()], [&r]);
        c.tally_mut().record_scan(&[r.clone()], &Vec::<Role>::new());

        let mut v = Vec::new();
        write_coupler(&c, &mut v).unwrap();
        assert!(String::from_utf8_lossy(&v)
            .starts_with("0\tRole-Coupling Database\tself-pairs\n"));
        let mut c1 = read_coupler(Cursor::new(v), "test").unwrap();
        assert!(c1.self_pairs());
        assert_eq!(c1.pair_count(&r, &r), 1);

        // Counting after a reload follows the same rule
        c1.tally_mut().record_scan(&[r.clone()], [&r]);
        assert_eq!(c1.pair_count(&r, &r), 2);

        // Without the marker self pairs are off
        let c2 = round_trip(&test_coupler());
        assert!(!c2.self_pairs());
    }

    #[test]
    fn unknown_header_option_is_corrupt() {
        let data = "100\tRole-Coupling Database\tstrand\n\
                    count\trole_id\trole_name\n";
        let e = read_coupler(Cursor::new(data), "test").unwrap_err();
        assert!(matches!(
            e.downcast_ref::<CouplingError>(),
            Some(CouplingError::CorruptState(_))
        ));
    }

    #[test]
    fn unknown_pair_role_is_fatal() {
        let data = "100\tRole-Coupling Database\n\
                    count\trole_id\trole_name\n\
                    3\tA\tAlpha\n\
                    role1_id\trole2_id\tcount\ttogetherness\n\
                    A\tZ\t2\t0.5\n";
        let e = read_coupler(Cursor::new(data), "test").unwrap_err();
        match e.downcast_ref::<CouplingError>() {
            Some(CouplingError::UnknownRole { role_id, line }) => {
                assert_eq!(role_id, "Z");
                assert_eq!(*line, 5);
            }
            x => panic!("Unexpected error {:?}", x),
        }
    }

    #[test]
    fn bad_header_is_corrupt() {
        for data in ["", "gap\tRole-Coupling Database\n", "100\tRole-Coupling Database\n"] {
            let e = read_coupler(Cursor::new(data), "test").unwrap_err();
            assert!(matches!(
                e.downcast_ref::<CouplingError>(),
                Some(CouplingError::CorruptState(_))
            ));
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("couples.tsv");
        let c = test_coupler();
        save_coupler(&c, &p).unwrap();
        assert!(!tmp_path(&p).exists());
        let c1 = load_coupler(&p).unwrap();
        assert_same_counts(&c, &c1);

        // Saving over an existing database replaces it
        let mut c2 = c1.clone();
        c2.count_couplings(&test_genome());
        save_coupler(&c2, &p).unwrap();
        assert_same_counts(&c2, &load_coupler(&p).unwrap());
    }

    #[test]
    fn failed_save_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("missing_dir").join("couples.tsv");
        assert!(save_coupler(&test_coupler(), &p).is_err());
        assert!(!p.exists());
    }
}
