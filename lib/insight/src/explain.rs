use crate::terminology::{DataDomain, Terminology};
use serde::{Deserialize, Serialize};

/// How the clustering grouped records, phrased for the data domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringExplanation {
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    pub note: String,
}

impl ClusteringExplanation {
    pub fn for_domain(domain: DataDomain, terms: &Terminology) -> Self {
        let plural = &terms.plural;
        let capitalized = terms.plural_capitalized();

        // identical codes land in different clusters when other attributes differ
        if domain == DataDomain::Alarm {
            return Self {
                title: "Why Same Alarm Codes Are in Different Clusters".to_string(),
                description: format!(
                    "Clustering uses multiple features (not just alarm code) to group {}. {} with the same code can be separated if they differ in:",
                    plural, capitalized
                ),
                features: to_strings(&[
                    "Affected object type and location",
                    "Object identifiers and relationships",
                    "Temporal patterns",
                    "Other characteristics",
                ]),
                note: "This is expected behavior - the same alarm code on different systems/objects forms separate clusters, helping identify which specific objects or systems are affected.".to_string(),
            };
        }

        Self {
            title: "How Clustering Works".to_string(),
            description: format!(
                "Clustering uses multiple features to group similar {}. {} in the same cluster share similar characteristics across:",
                plural, capitalized
            ),
            features: to_strings(&[
                "Numerical measurements",
                "Categorical attributes",
                "Pattern similarities",
                "Statistical distributions",
            ]),
            note: "The algorithm automatically discovered these groupings based on similarities in the data.".to_string(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
