use std::collections::HashMap;
use tracing::warn;

use crate::{CanonicalEntity, RawAffiliations};

/// Substrings that mark the institution part of an affiliation.
pub const INSTITUTION_KEYWORDS: &[&str] = &[
    "Polytechnic",
    "NIT",
    "MIT",
    "Politecnico",
    "Escuela",
    "École",
    "Institut",
    "Universitat",
    "Università",
    "Universität",
    "Universidad",
    "University",
    "Institute",
    "Ecole",
    "Universiti",
    "Université",
    "College",
    "School",
];

pub fn default_keywords() -> Vec<String> {
    INSTITUTION_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Rightmost comma-separated part that contains a keyword, trimmed.
pub fn institution_name(affiliation: &str, keywords: &[String]) -> Option<String> {
    affiliation
        .rsplit(',')
        .find(|part| keywords.iter().any(|k| part.contains(k.as_str())))
        .map(|part| part.trim().to_string())
}

/// Provisional entities keyed by institution name, in first-seen order.
#[derive(Debug, Default)]
pub struct Classified {
    pub entities: Vec<(String, CanonicalEntity)>,
    pub rejected: Vec<String>,
}

pub fn classify(raw: &RawAffiliations, keywords: &[String]) -> Classified {
    let mut classified = Classified::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (affiliation, &count) in raw.iter() {
        let Some(name) = institution_name(affiliation, keywords) else {
            warn!("Not accepted affiliation: {}", affiliation);
            classified.rejected.push(affiliation.clone());
            continue;
        };

        match positions.get(&name) {
            Some(&pos) => {
                let entity = &mut classified.entities[pos].1;
                entity.init_names.push(affiliation.clone());
                entity.count += count;
            }
            None => {
                positions.insert(name.clone(), classified.entities.len());
                classified
                    .entities
                    .push((name, CanonicalEntity::new(affiliation.clone(), count)));
            }
        }
    }

    classified
}
