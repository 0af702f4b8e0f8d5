use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    io::BufRead,
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::get_next_line;

/// Role
///
/// id - stable identifier; two roles are the same role iff their ids match
/// name - the text used for the role in functional annotations
///
/// Both strings are shared between the vocabulary, the tally and the report
/// so we use Arc<str>
#[derive(Debug, Clone)]
pub struct Role {
    id: Arc<str>,
    name: Arc<str>,
}

impl Role {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: Arc::from(id),
            name: Arc::from(name),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Vocabulary
///
/// The closed set of recognized roles, indexed both by name (for parsing
/// annotations) and by id (for reading stored databases)
#[derive(Debug, Default, Clone)]
pub struct Vocabulary {
    by_name: HashMap<Arc<str>, Role>,
    by_id: HashMap<Arc<str>, Role>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role with an explicit id.  Returns false (and leaves the
    /// vocabulary unchanged) if either the id or the name is already present
    pub fn insert(&mut self, role: Role) -> bool {
        if self.by_id.contains_key(&role.id) || self.by_name.contains_key(&role.name) {
            false
        } else {
            self.by_id.insert(Arc::clone(&role.id), role.clone());
            self.by_name.insert(Arc::clone(&role.name), role);
            true
        }
    }

    /// Add a role by name, generating an id for it if it is new.
    ///
    /// The id is made from the alphanumeric characters of the name with a
    /// numeric suffix to keep it unique, so "Role 1" becomes "Role1n1"
    pub fn register(&mut self, name: &str) -> Role {
        if let Some(r) = self.by_name.get(name) {
            return r.clone();
        }
        let prefix: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
        let mut k = 1;
        let id = loop {
            let id = format!("{}n{}", prefix, k);
            if !self.by_id.contains_key(id.as_str()) {
                break id;
            }
            k += 1;
        };
        let role = Role::new(&id, name);
        self.insert(role.clone());
        role
    }

    /// Look up a role by its exact name
    pub fn find(&self, name: &str) -> Option<&Role> {
        self.by_name.get(name)
    }

    /// Look up a role by id
    pub fn get(&self, id: &str) -> Option<&Role> {
        self.by_id.get(id)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Add all roles from other that are not already present (by id)
    pub fn merge(&mut self, other: &Vocabulary) {
        for r in other.by_id.values() {
            match self.by_id.get(r.id()) {
                Some(x) if x.name() != r.name() => warn!(
                    "Role {} is named '{}' here and '{}' in merged data; keeping '{}'",
                    r.id(),
                    x.name(),
                    r.name(),
                    x.name()
                ),
                Some(_) => (),
                None => {
                    if !self.insert(r.clone()) {
                        warn!("Role name '{}' ({}) already in use; skipped", r.name(), r.id())
                    }
                }
            }
        }
    }
}

/// Read in role vocabulary from file
/// Expects one or two tab separated columns.
/// With two columns the first is the role id and the second the role name.
/// With one column it is the role name and an id is generated for it.
pub fn read_vocabulary<P: AsRef<Path>>(fname: P) -> anyhow::Result<Vocabulary> {
    debug!("Reading in role vocabulary from {}", fname.as_ref().display());

    trace!("Opening role file for reading");
    let rdr = CompressIo::new()
        .path(&fname)
        .bufreader()
        .with_context(|| format!("Error opening role file {}", fname.as_ref().display()))?;
    vocabulary_from_reader(rdr, &fname.as_ref().display().to_string())
}

pub fn vocabulary_from_reader<R: BufRead>(mut rdr: R, desc: &str) -> anyhow::Result<Vocabulary> {
    let mut buf = String::new();
    let mut line = 0;
    let mut voc = Vocabulary::new();

    while let Some(fields) = get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, desc))?
    {
        line += 1;
        // Skip blank lines
        match fields.as_slice() {
            [""] => (),
            [name] => {
                voc.register(name.trim());
            }
            [id, name, ..] => {
                if !voc.insert(Role::new(id.trim(), name.trim())) {
                    warn!("{}:{} Duplicate role {} ('{}') skipped", desc, line, id, name)
                }
            }
            [] => (),
        }
    }

    debug!(
        "Finished reading in {} lines; found {} roles",
        line,
        voc.len()
    );
    Ok(voc)
}
