use std::path::{Path, PathBuf};

use role_coupling::{report::Thresholds, role::Vocabulary};

/// How the coupling database is started
///
/// Create - new, empty database for the given roles and neighbour gap
/// Continue - load the existing database and add to it
pub enum RunMode {
    Create { vocabulary: Vocabulary, gap: usize },
    Continue,
}

/// Config
///
/// Configuration info for the program
/// This is generated from the command line arguments
/// Once set it is read only
///
/// coupler_file - coupling database; read in continue mode, always written at the end
/// genome_dirs - directories of genome feature tables to count
/// mode - create or continue
/// thresholds - minimum togetherness and count for reported pairs
/// compare_file - optional baseline database to check reported pairs against
/// compare_thresholds - togetherness and count limits for flagging disagreement with the baseline
/// merge_files - other databases to add in before counting
/// self_pairs - count a role found next to itself
/// output_file - report destination (default stdout)
///
pub struct Config {
    coupler_file: PathBuf,
    genome_dirs: Vec<PathBuf>,
    mode: RunMode,
    thresholds: Thresholds,
    compare_file: Option<PathBuf>,
    compare_thresholds: Thresholds,
    merge_files: Vec<PathBuf>,
    self_pairs: bool,
    output_file: Option<PathBuf>,
}

impl Config {
    pub fn new(coupler_file: PathBuf, genome_dirs: Vec<PathBuf>, mode: RunMode) -> Self {
        Self {
            coupler_file,
            genome_dirs,
            mode,
            thresholds: Thresholds::new(0.8, 10),
            compare_file: None,
            compare_thresholds: Thresholds::new(0.7, 20),
            merge_files: Vec::new(),
            self_pairs: false,
            output_file: None,
        }
    }

    pub fn set_thresholds(&mut self, t: Thresholds) {
        self.thresholds = t
    }

    pub fn set_compare(&mut self, p: PathBuf, t: Thresholds) {
        self.compare_file = Some(p);
        self.compare_thresholds = t
    }

    pub fn set_merge_files(&mut self, v: Vec<PathBuf>) {
        self.merge_files = v
    }

    pub fn set_self_pairs(&mut self) {
        self.self_pairs = true
    }

    pub fn set_output_file(&mut self, p: PathBuf) {
        self.output_file = Some(p)
    }

    pub fn coupler_file(&self) -> &Path {
        &self.coupler_file
    }

    pub fn genome_dirs(&self) -> &[PathBuf] {
        &self.genome_dirs
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn compare_file(&self) -> Option<&Path> {
        self.compare_file.as_deref()
    }

    pub fn compare_thresholds(&self) -> Thresholds {
        self.compare_thresholds
    }

    pub fn merge_files(&self) -> &[PathBuf] {
        &self.merge_files
    }

    pub fn self_pairs(&self) -> bool {
        self.self_pairs
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }
}
