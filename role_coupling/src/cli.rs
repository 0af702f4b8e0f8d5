use std::path::{Path, PathBuf};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, parser::ValueSource,
    value_parser, Arg, ArgAction, ArgMatches, Command,
};

use anyhow::Context;

use role_coupling::{error::CouplingError, report::Thresholds, role::read_vocabulary};
use utils::{init_log, LogLevel};

use crate::config::*;

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("create")
                .action(ArgAction::SetTrue)
                .long("create")
                .help("Create a new coupling database instead of adding to an existing one"),
        )
        .arg(
            Arg::new("gap")
                .short('g')
                .long("gap")
                .value_parser(value_parser!(usize))
                .value_name("INT")
                .default_value("500")
                .help("Maximum distance between neighbouring features (create only)"),
        )
        .arg(
            Arg::new("roles")
                .short('R')
                .long("roles")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("File of useful roles (create only)"),
        )
        .arg(
            Arg::new("min_togetherness")
                .short('t')
                .long("min-togetherness")
                .value_parser(value_parser!(f64))
                .value_name("FRACTION")
                .default_value("0.80")
                .help("Minimum togetherness for a pair to be reported"),
        )
        .arg(
            Arg::new("min_count")
                .short('m')
                .long("min-count")
                .value_parser(value_parser!(usize))
                .value_name("INT")
                .default_value("10")
                .help("Minimum number of times a pair is seen together to be reported"),
        )
        .arg(
            Arg::new("compare")
                .long("compare")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Check reported pairs against another coupling database"),
        )
        .arg(
            Arg::new("compare_togetherness")
                .short('u')
                .long("compare-togetherness")
                .value_parser(value_parser!(f64))
                .value_name("FRACTION")
                .default_value("0.70")
                .help("Minimum togetherness for a pair to agree with the comparison database"),
        )
        .arg(
            Arg::new("compare_count")
                .short('n')
                .long("compare-count")
                .value_parser(value_parser!(usize))
                .value_name("INT")
                .default_value("20")
                .help("Minimum role occurrences in the comparison database for a disagreement"),
        )
        .arg(
            Arg::new("merge")
                .long("merge")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .action(ArgAction::Append)
                .help("Add the counts from another coupling database (can be repeated)"),
        )
        .arg(
            Arg::new("self_pairs")
                .action(ArgAction::SetTrue)
                .long("self-pairs")
                .help("Count a role found next to a feature with the same role (must match an existing database)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-file")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set output file for report [default: <stdout>]"),
        )
        .arg(
            Arg::new("coupler_file")
                .value_parser(value_parser!(PathBuf))
                .value_name("COUPLER_FILE")
                .required(true)
                .help("Coupling database file"),
        )
        .arg(
            Arg::new("genome_dirs")
                .value_parser(value_parser!(PathBuf))
                .value_name("GENOME_DIR")
                .num_args(0..)
                .help("Directories of genome feature tables"),
        )
}

fn config_err<S: Into<String>>(s: S) -> anyhow::Error {
    CouplingError::Configuration(s.into()).into()
}

fn check_file(p: &Path, desc: &str) -> anyhow::Result<()> {
    if p.is_file() {
        Ok(())
    } else {
        Err(config_err(format!("{} {} not found", desc, p.display())))
    }
}

fn get_fraction(m: &ArgMatches, id: &str) -> anyhow::Result<f64> {
    let x = *m
        .get_one::<f64>(id)
        .with_context(|| format!("Missing default for {}", id))?;
    if (0.0..=1.0).contains(&x) {
        Ok(x)
    } else {
        Err(config_err(format!(
            "Togetherness threshold {} is not between 0 and 1",
            x
        )))
    }
}

fn get_count(m: &ArgMatches, id: &str) -> anyhow::Result<usize> {
    m.get_one::<usize>(id)
        .copied()
        .with_context(|| format!("Missing default for {}", id))
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m)?;

    debug!("Processing command line options");

    let coupler_file = m
        .get_one::<PathBuf>("coupler_file")
        .expect("Missing coupler file")
        .clone();

    let mode = if m.get_flag("create") {
        let gap = get_count(&m, "gap")?;
        let role_file = m
            .get_one::<PathBuf>("roles")
            .ok_or_else(|| config_err("Role file required in create mode"))?;
        check_file(role_file, "Role file")?;
        let vocabulary = read_vocabulary(role_file)
            .with_context(|| "Could not read from role file")?;
        if vocabulary.is_empty() {
            warn!("No roles found in {}", role_file.display())
        }
        RunMode::Create { vocabulary, gap }
    } else {
        check_file(&coupler_file, "Coupling database")
            .with_context(|| "Coupling database must exist unless --create is specified")?;
        if m.value_source("gap") == Some(ValueSource::CommandLine) {
            warn!("Gap option ignored: the gap is taken from the existing database")
        }
        if m.contains_id("roles") {
            warn!("Role file ignored: the roles are taken from the existing database")
        }
        RunMode::Continue
    };

    let genome_dirs: Vec<PathBuf> = m
        .get_many::<PathBuf>("genome_dirs")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    for d in genome_dirs.iter() {
        if !d.is_dir() {
            return Err(config_err(format!(
                "{} is not a valid directory",
                d.display()
            )));
        }
    }
    debug!("Number of genome directories: {}", genome_dirs.len());

    let mut cfg = Config::new(coupler_file, genome_dirs, mode);
    cfg.set_thresholds(Thresholds::new(
        get_fraction(&m, "min_togetherness")?,
        get_count(&m, "min_count")?,
    ));

    if let Some(p) = m.get_one::<PathBuf>("compare") {
        check_file(p, "Comparison database")?;
        cfg.set_compare(
            p.to_owned(),
            Thresholds::new(
                get_fraction(&m, "compare_togetherness")?,
                get_count(&m, "compare_count")?,
            ),
        )
    }

    if let Some(v) = m.get_many::<PathBuf>("merge") {
        let v: Vec<PathBuf> = v.cloned().collect();
        for p in v.iter() {
            check_file(p, "Merge database")?;
        }
        cfg.set_merge_files(v)
    }

    if m.get_flag("self_pairs") {
        cfg.set_self_pairs()
    }

    if let Some(p) = m.get_one::<PathBuf>("output") {
        cfg.set_output_file(p.to_owned())
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_model_is_valid() {
        cli_model().debug_assert();
    }

    #[test]
    fn defaults() {
        let m = cli_model()
            .try_get_matches_from(["role_coupling", "couples.tsv", "dir1", "dir2"])
            .unwrap();
        assert!(!m.get_flag("create"));
        assert_eq!(get_count(&m, "gap").unwrap(), 500);
        assert_eq!(get_fraction(&m, "min_togetherness").unwrap(), 0.8);
        assert_eq!(get_count(&m, "min_count").unwrap(), 10);
        assert_eq!(get_fraction(&m, "compare_togetherness").unwrap(), 0.7);
        assert_eq!(get_count(&m, "compare_count").unwrap(), 20);
        assert_eq!(m.get_many::<PathBuf>("genome_dirs").unwrap().count(), 2);
        assert_ne!(m.value_source("gap"), Some(ValueSource::CommandLine));
    }

    #[test]
    fn fraction_out_of_range() {
        let m = cli_model()
            .try_get_matches_from(["role_coupling", "-t", "1.5", "couples.tsv"])
            .unwrap();
        let e = get_fraction(&m, "min_togetherness").unwrap_err();
        assert!(matches!(
            e.downcast_ref::<CouplingError>(),
            Some(CouplingError::Configuration(_))
        ));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let e = check_file(Path::new("/no/such/roles.tsv"), "Role file").unwrap_err();
        assert!(matches!(
            e.downcast_ref::<CouplingError>(),
            Some(CouplingError::Configuration(_))
        ));
    }
}
