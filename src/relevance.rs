// src/relevance.rs
//! Transfer relevance gate: a transfer-activity term plus a club (or league) mention.
//! Vocabulary and roster are static; nothing is learned or cached.

use tracing::debug;

pub const TRANSFER_TERMS: &[&str] = &[
    "transfer",
    "signing",
    "signs",
    "joins",
    "deal",
    "agreement",
    "confirmed",
    "announce",
    "complete",
    "agreed",
    "move",
    "contract",
    "fee",
    "loan",
    "permanent",
];

/// Recognized clubs, lower-case.
pub const CLUBS: &[&str] = &[
    "arsenal",
    "aston villa",
    "bournemouth",
    "brentford",
    "brighton",
    "burnley",
    "chelsea",
    "crystal palace",
    "everton",
    "fulham",
    "liverpool",
    "luton",
    "manchester city",
    "manchester united",
    "newcastle",
    "nottingham forest",
    "sheffield united",
    "tottenham",
    "west ham",
    "wolves",
];

pub const LEAGUE_PHRASE: &str = "premier league";

/// What matched in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub terms: Vec<&'static str>,
    pub clubs: Vec<&'static str>,
    pub league: bool,
}

impl Classification {
    pub fn is_relevant(&self) -> bool {
        !self.terms.is_empty() && (!self.clubs.is_empty() || self.league)
    }
}

pub fn classify(text: &str) -> Classification {
    if text.trim().is_empty() {
        return Classification::default();
    }
    let lower = text.to_lowercase();
    Classification {
        terms: TRANSFER_TERMS
            .iter()
            .copied()
            .filter(|t| lower.contains(t))
            .collect(),
        clubs: CLUBS.iter().copied().filter(|c| lower.contains(c)).collect(),
        league: lower.contains(LEAGUE_PHRASE),
    }
}

pub fn is_relevant(text: &str) -> bool {
    let c = classify(text);
    let keep = c.is_relevant();
    debug!(
        target: "relevance",
        id = %anon_hash(text),
        keep,
        terms = ?c.terms,
        clubs = ?c.clubs,
        league = c.league
    );
    keep
}

/// Case-insensitive substring match against the club roster.
pub fn is_recognized_club(name: &str) -> bool {
    let lower = name.to_lowercase();
    !lower.trim().is_empty() && CLUBS.iter().any(|c| lower.contains(c))
}

/// Short hash so logs never carry raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
