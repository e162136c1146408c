use std::fmt;

use serde::{Deserialize, Serialize};

/// Target audience of a content request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Audience {
    Linkedin,
    PolicyUs,
    Investor,
    EgyptGov,
    Technical,
    General,
}

/// Audience -> number of passages retrieved for its chain.
const ROUTES: [(Audience, usize); 6] = [
    (Audience::Linkedin, 2),
    (Audience::PolicyUs, 10),
    (Audience::Investor, 5),
    (Audience::EgyptGov, 5),
    (Audience::Technical, 5),
    (Audience::General, 3),
];

impl Audience {
    pub const ALL: [Audience; 6] = [
        Audience::Linkedin,
        Audience::PolicyUs,
        Audience::Investor,
        Audience::EgyptGov,
        Audience::Technical,
        Audience::General,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Audience::Linkedin => "LINKEDIN",
            Audience::PolicyUs => "POLICY_US",
            Audience::Investor => "INVESTOR",
            Audience::EgyptGov => "EGYPT_GOV",
            Audience::Technical => "TECHNICAL",
            Audience::General => "GENERAL",
        }
    }

    /// Parses a classifier reply. Anything that is not exactly a label is `General`.
    pub fn parse(reply: &str) -> Self {
        let label = reply.trim().trim_matches(|c| c == '"' || c == '.').to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|a| a.label() == label)
            .unwrap_or(Audience::General)
    }

    pub fn neighbor_count(self) -> usize {
        ROUTES
            .iter()
            .find(|(a, _)| *a == self)
            .map(|(_, k)| *k)
            .unwrap_or(3)
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
