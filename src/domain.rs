//! Domain taxonomy: top-level domains and their direct children.

use serde::Serialize;

use crate::model::Domain;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainNode {
    #[serde(flatten)]
    pub domain: Domain,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Domain>,
}

/// Group domains one level deep. Input order (sort order) is kept for both
/// parents and children. Grandchildren are not shown, and a child whose
/// parent is missing is not shown either.
pub fn build_tree(domains: &[Domain]) -> Vec<DomainNode> {
    domains
        .iter()
        .filter(|domain| domain.parent_id.is_none())
        .map(|parent| DomainNode {
            domain: parent.clone(),
            children: domains
                .iter()
                .filter(|child| child.parent_id.as_deref() == Some(parent.id.as_str()))
                .cloned()
                .collect(),
        })
        .collect()
}
