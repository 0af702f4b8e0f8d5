use std::{
    collections::HashMap,
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use regex::Regex;
use utils::{get_next_line, parse_field};

use crate::error::CouplingError;

/// Feature
///
/// A gene (or other annotated region) on a contig.  Coordinates are stored
/// with start <= end whatever the strand, as strand plays no part in
/// neighbour distances.
#[derive(Debug, Clone)]
pub struct Feature {
    id: String,
    start: usize,
    end: usize,
    function: String,
}

impl Feature {
    pub fn new(id: &str, start: usize, end: usize, function: &str) -> Self {
        Self {
            id: id.to_owned(),
            start: start.min(end),
            end: start.max(end),
            function: function.to_owned(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Number of bases between the nearer edges of the two features,
    /// or 0 if they overlap
    pub fn distance(&self, other: &Feature) -> usize {
        if self.end < other.start {
            other.start - self.end
        } else if other.end < self.start {
            self.start - other.end
        } else {
            0
        }
    }
}

/// Contig
///
/// Features are kept sorted on (start, end); features with identical
/// coordinates keep their insertion order
#[derive(Debug)]
pub struct Contig {
    name: Arc<str>,
    features: Vec<Feature>,
}

impl Contig {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            features: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn add_feature(&mut self, f: Feature) {
        let key = (f.start, f.end);
        let ix = self.features.partition_point(|x| (x.start, x.end) <= key);
        self.features.insert(ix, f)
    }
}

/// Genome
///
/// Contigs are kept in the order they were first seen
#[derive(Debug)]
pub struct Genome {
    id: String,
    contigs: Vec<Contig>,
    ctg_hash: HashMap<Arc<str>, usize>,
}

impl Genome {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            contigs: Vec::new(),
            ctg_hash: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn n_features(&self) -> usize {
        self.contigs.iter().map(|c| c.features.len()).sum()
    }

    pub fn add_feature(&mut self, ctg: &str, f: Feature) {
        let ix = match self.ctg_hash.get(ctg) {
            Some(i) => *i,
            None => {
                trace!("Adding contig {} to genome {}", ctg, self.id);
                let c = Contig::new(ctg);
                let i = self.contigs.len();
                self.ctg_hash.insert(Arc::clone(&c.name), i);
                self.contigs.push(c);
                i
            }
        };
        self.contigs[ix].add_feature(f)
    }
}

/// Collect the genome feature tables in a directory, sorted on file name.
/// Genome files are named <genome id>.tbl, optionally with a compression suffix.
/// Returns a vector of (genome id, path) tuples
pub fn genome_files(dir: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let reg = Regex::new(r"^(.+)[.]tbl(?:[.](?:gz|bz2|xz|zst))?$")?;
    let mut v = Vec::new();

    let entries = dir.read_dir().map_err(|e| {
        CouplingError::Configuration(format!(
            "Could not read genome directory {}: {}",
            dir.display(),
            e
        ))
    })?;
    for f in entries {
        let entry =
            f.with_context(|| format!("Could not get directory entry from {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping file with non UTF-8 name in {}", dir.display());
                continue;
            };
            if let Some(c) = reg.captures(name.as_str()) {
                let id = c.get(1).map(|m| m.as_str()).unwrap_or(name.as_str());
                trace!("Adding genome file {} ({})", path.display(), id);
                v.push((id.to_owned(), path));
            }
        }
    }
    v.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    if v.is_empty() {
        warn!("No genome files found in {}", dir.display())
    } else {
        debug!("{} genome files found in {}", v.len(), dir.display());
    }
    Ok(v)
}

/// Read a genome from a feature table file
pub fn read_genome<P: AsRef<Path>>(id: &str, fname: P) -> anyhow::Result<Genome> {
    trace!("Opening genome file {} for reading", fname.as_ref().display());
    let rdr = CompressIo::new()
        .path(&fname)
        .bufreader()
        .with_context(|| format!("Error opening genome file {}", fname.as_ref().display()))?;
    genome_from_reader(id, rdr, &fname.as_ref().display().to_string())
}

/// Feature table format
///
/// Tab separated lines of feature id, contig, start, end and (optionally) function.
/// Lines starting with '#' and lines with fewer than 4 columns are skipped.
pub fn genome_from_reader<R: BufRead>(id: &str, mut rdr: R, desc: &str) -> anyhow::Result<Genome> {
    let mut buf = String::new();
    let mut line = 0;
    let mut genome = Genome::new(id);

    while let Some(fields) = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, desc))?
    {
        line += 1;
        // Skip comments and short lines
        if fields.len() >= 4 && !fields[0].starts_with('#') {
            let start = parse_field::<usize>(&fields, 2, "start")
                .with_context(|| format!("{}:{} Error reading feature", desc, line))?;
            let end = parse_field::<usize>(&fields, 3, "end")
                .with_context(|| format!("{}:{} Error reading feature", desc, line))?;
            let function = fields.get(4).copied().unwrap_or("");
            genome.add_feature(fields[1], Feature::new(fields[0], start, end, function))
        }
    }

    debug!(
        "Read {} features on {} contigs for genome {}",
        genome.n_features(),
        genome.contigs.len(),
        genome.id
    );
    Ok(genome)
}
