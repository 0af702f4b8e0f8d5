use std::{io::Write, path::PathBuf};

use anyhow::Context;
use compress_io::compress::CompressIo;

use role_coupling::{
    codec::{load_coupler, save_coupler},
    coupler::Coupler,
    error::CouplingError,
    genome::{genome_files, read_genome},
    report::{compare, report, write_report},
};

use crate::config::{Config, RunMode};

/// Strategy
///
/// Set up the coupler, either new (create mode) or from the existing database,
/// and add in any databases to be merged.  The genome files are listed
/// before counting starts so that a bad directory stops the run before any
/// work is done.  Each genome is then counted in turn, and the database is
/// only written once all genomes have been processed.  Finally the pairs
/// passing the thresholds are reported, checked against the comparison
/// database if one was given.
pub fn process_genomes(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");

    // Read the comparison database first so any problems show up before counting
    let baseline = match cfg.compare_file() {
        Some(p) => {
            info!("Loading comparison database from {}", p.display());
            Some(load_coupler(p)?)
        }
        None => None,
    };

    let mut coupler = match cfg.mode() {
        RunMode::Create { vocabulary, gap } => {
            info!(
                "Initializing new coupling database with {} roles and gap {}",
                vocabulary.len(),
                gap
            );
            let mut c = Coupler::new(vocabulary.clone(), *gap);
            c.set_self_pairs(cfg.self_pairs());
            c
        }
        RunMode::Continue => {
            info!(
                "Loading coupling database from {}",
                cfg.coupler_file().display()
            );
            let c = load_coupler(cfg.coupler_file())?;
            // Counts made with and without self pairs cannot be mixed
            if c.self_pairs() != cfg.self_pairs() {
                return Err(CouplingError::Configuration(format!(
                    "{} was built {} self pairs: {} --self-pairs to continue it",
                    cfg.coupler_file().display(),
                    if c.self_pairs() { "with" } else { "without" },
                    if c.self_pairs() { "use" } else { "do not use" },
                ))
                .into());
            }
            c
        }
    };

    for p in cfg.merge_files() {
        info!("Merging coupling database from {}", p.display());
        let other = load_coupler(p)?;
        coupler
            .merge(&other)
            .with_context(|| format!("Could not merge {}", p.display()))?;
    }

    let mut genomes: Vec<(String, PathBuf)> = Vec::new();
    for d in cfg.genome_dirs() {
        genomes.extend(genome_files(d)?);
    }
    debug!("{} genomes to process", genomes.len());

    for (id, p) in genomes.iter() {
        info!("Processing genome {}", id);
        let genome = read_genome(id, p)?;
        coupler.count_couplings(&genome);
    }

    info!(
        "Saving coupling database to {}",
        cfg.coupler_file().display()
    );
    save_coupler(&coupler, cfg.coupler_file())?;

    let rows = match baseline.as_ref() {
        Some(b) => compare(&coupler, cfg.thresholds(), b, cfg.compare_thresholds()),
        None => report(&coupler, cfg.thresholds()),
    };

    let mut wrt = CompressIo::new()
        .opt_path(cfg.output_file())
        .bufwriter()
        .with_context(|| "Failed to open output file")?;
    let summary = write_report(&rows, baseline.is_some(), &mut wrt)
        .with_context(|| "Error writing report")?;
    wrt.flush().with_context(|| "Error writing report")?;

    if baseline.is_some() {
        info!(
            "Failure count for comparison is {} ({} of {} pairs compared)",
            summary.n_failures, summary.n_compared, summary.n_pairs
        );
    }
    info!("{} couplings found", summary.n_pairs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use role_coupling::{report::Thresholds, role::read_vocabulary};
    use std::{fs, path::Path};

    const ROLES: &str = "Role1n1\tRole 1\nRole2n1\tRole 2\nRole3n1\tRole 3\n\
                         Role4n1\tRole 4\nRole5n1\tRole 5\nRole6n1\tRole 6\n";

    const GENOME: &str = "fig|12345.6.peg.1\tcon1\t100\t300\tRole 1\n\
                          fig|12345.6.peg.2\tcon1\t400\t100\tRole 2\n\
                          fig|12345.6.peg.3\tcon1\t200\t500\tRole 3\n\
                          fig|12345.6.peg.4\tcon1\t1200\t1000\tRole 4\n\
                          fig|12345.6.peg.5\tcon1\t1010\t1300\tRole 5\n\
                          fig|12345.6.peg.6\tcon1\t4000\t3300\tRole 6 / Role 1\n\
                          fig|12345.6.peg.7\tcon1\t5100\t5000\tRole 2 # comment\n\
                          fig|12345.6.peg.8\tcon1\t5150\t5200\tRole 3 @ Role X\n\
                          fig|12345.6.peg.9\tcon1\t5250\t5400\tRole 1\n\
                          fig|12345.6.peg.10\tcon1\t5450\t5401\tRole 2\n";

    fn setup(dir: &Path) -> (PathBuf, PathBuf) {
        let roles = dir.join("roles.tsv");
        fs::write(&roles, ROLES).unwrap();
        let gdir = dir.join("genomes");
        fs::create_dir(&gdir).unwrap();
        fs::write(gdir.join("12345.6.tbl"), GENOME).unwrap();
        (roles, gdir)
    }

    #[test]
    fn create_then_continue() {
        let dir = tempfile::tempdir().unwrap();
        let (roles, gdir) = setup(dir.path());
        let db = dir.path().join("couples.tsv");
        let out = dir.path().join("report.tsv");

        let mode = RunMode::Create {
            vocabulary: read_vocabulary(&roles).unwrap(),
            gap: 100,
        };
        let mut cfg = Config::new(db.clone(), vec![gdir.clone()], mode);
        cfg.set_thresholds(Thresholds::new(0.5, 2));
        cfg.set_output_file(out.clone());
        process_genomes(&cfg).unwrap();

        let c = load_coupler(&db).unwrap();
        assert_eq!(c.gap(), 100);
        let r1 = c.get_role("Role1n1").unwrap();
        let r2 = c.get_role("Role2n1").unwrap();
        assert_eq!(c.occurrence_count(r1), 3);
        assert_eq!(c.pair_count(r1, r2), 2);
        let report = fs::read_to_string(&out).unwrap();
        assert!(report.starts_with("role_id1\trole_id2\tfraction\tcount\n"));
        assert_eq!(report.lines().count(), 4);

        // Second pass over the same genome, compared against the first database
        let first = dir.path().join("first.tsv");
        fs::copy(&db, &first).unwrap();
        let mut cfg = Config::new(db.clone(), vec![gdir], RunMode::Continue);
        cfg.set_thresholds(Thresholds::new(0.5, 2));
        cfg.set_compare(first, Thresholds::new(0.7, 1));
        cfg.set_output_file(out.clone());
        process_genomes(&cfg).unwrap();

        let c = load_coupler(&db).unwrap();
        let r1 = c.get_role("Role1n1").unwrap();
        let r2 = c.get_role("Role2n1").unwrap();
        assert_eq!(c.occurrence_count(r1), 6);
        assert_eq!(c.pair_count(r1, r2), 4);
        let report = fs::read_to_string(&out).unwrap();
        let mut lines = report.lines();
        assert_eq!(
            lines.next(),
            Some("role_id1\trole_id2\tfraction\tcount\totherFrac\totherCount\totherFound\tfailure")
        );
        for l in lines {
            assert_eq!(l.split('\t').count(), 8);
        }
    }

    #[test]
    fn self_pairs_setting_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let (roles, gdir) = setup(dir.path());
        let db = dir.path().join("couples.tsv");
        let out = dir.path().join("report.tsv");

        let mode = RunMode::Create {
            vocabulary: read_vocabulary(&roles).unwrap(),
            gap: 100,
        };
        let mut cfg = Config::new(db.clone(), vec![gdir.clone()], mode);
        cfg.set_self_pairs();
        cfg.set_output_file(out.clone());
        process_genomes(&cfg).unwrap();
        assert!(load_coupler(&db).unwrap().self_pairs());
        let before = fs::read_to_string(&db).unwrap();

        // Continuing without the flag is refused
        let mut cfg = Config::new(db.clone(), vec![gdir.clone()], RunMode::Continue);
        cfg.set_output_file(out.clone());
        let e = process_genomes(&cfg).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<CouplingError>(),
            Some(CouplingError::Configuration(_))
        ));
        assert_eq!(fs::read_to_string(&db).unwrap(), before);

        // With the flag the counts double
        let mut cfg = Config::new(db.clone(), vec![gdir], RunMode::Continue);
        cfg.set_self_pairs();
        cfg.set_output_file(out);
        process_genomes(&cfg).unwrap();
        let c = load_coupler(&db).unwrap();
        assert!(c.self_pairs());
        let r1 = c.get_role("Role1n1").unwrap();
        assert_eq!(c.occurrence_count(r1), 6);
    }

    #[test]
    fn bad_genome_leaves_database_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (roles, gdir) = setup(dir.path());
        let db = dir.path().join("couples.tsv");

        let mode = RunMode::Create {
            vocabulary: read_vocabulary(&roles).unwrap(),
            gap: 100,
        };
        let mut cfg = Config::new(db.clone(), vec![gdir.clone()], mode);
        cfg.set_output_file(dir.path().join("report.tsv"));
        process_genomes(&cfg).unwrap();
        let before = fs::read_to_string(&db).unwrap();

        fs::write(gdir.join("99999.1.tbl"), "fig|99999.1.peg.1\tc\tx\t10\tRole 1\n").unwrap();
        let mut cfg = Config::new(db.clone(), vec![gdir], RunMode::Continue);
        cfg.set_output_file(dir.path().join("report.tsv"));
        assert!(process_genomes(&cfg).is_err());
        assert_eq!(fs::read_to_string(&db).unwrap(), before);
    }
}
