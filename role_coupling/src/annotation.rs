use crate::role::{Role, Vocabulary};

/// Extract the recognized roles from a functional annotation.
///
/// A trailing comment starting with '#' is removed, then the rest is split
/// on '/' (alternative roles) and '@' (multifunctional proteins).  Each part is
/// trimmed and looked up by exact name.  Parts that are not in the vocabulary
/// are dropped, and a role named more than once is only returned once.
pub fn parse_roles(function: &str, voc: &Vocabulary) -> Vec<Role> {
    let text = function
        .split_once('#')
        .map(|(s, _)| s)
        .unwrap_or(function);

    let mut roles: Vec<Role> = Vec::new();
    for r in text
        .split(&['/', '@'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| voc.find(s))
    {
        if !roles.contains(r) {
            roles.push(r.clone())
        }
    }
    roles
}
