//! Regex-based citation extraction (§4.4).
//!
//! Patterns and the leading-phrase strip list are ported verbatim in
//! semantics from the citation verification agent this crate replaces,
//! widened beyond spec.md's three named examples to the full strip list.

use regex::Regex;
use std::sync::OnceLock;

/// One citation found in assistant response text, with the reconstructed
/// clean citation text and kind-specific capture groups.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedCitation {
    Legislation { text: String, act_name: String, section: Option<String>, subsection: Option<String> },
    CaseLaw { text: String, case_name: String, neutral_citation: String },
    Policy { text: String, document_name: String, section: Option<String> },
}

impl ExtractedCitation {
    /// The reconstructed, clean citation text common to every variant.
    pub fn text(&self) -> &str {
        match self {
            ExtractedCitation::Legislation { text, .. }
            | ExtractedCitation::CaseLaw { text, .. }
            | ExtractedCitation::Policy { text, .. } => text,
        }
    }
}

const LEADING_PHRASES: &[&str] = &[
    "The ",
    "A ",
    "An ",
    "See ",
    "According to the ",
    "Under the ",
    "As established in ",
    "As ",
    "In ",
    "From ",
];

fn strip_leading_phrase(name: &str) -> &str {
    for prefix in LEADING_PHRASES {
        if let Some(stripped) = name.strip_prefix(prefix) {
            return stripped;
        }
    }
    name
}

fn legislation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*\s+Act\s+\d{4})(?:,\s*s\.(\d+[A-Z]?)(?:\((\d+[a-z]?)\))?)?",
        )
        .expect("legislation pattern is a valid regex")
    })
}

fn case_law_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]+)*\s+v\s+[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)\s+\[(\d{4})\]\s+([A-Z]+(?:\s+[A-Z][a-z]+)?)\s+(\d+)",
        )
        .expect("case law pattern is a valid regex")
    })
}

fn policy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*\s+Policy)(?:,\s*(Section\s+[\w\d]+))?")
            .expect("policy pattern is a valid regex")
    })
}

/// Extracts every citation from response text, in order of appearance
/// within each kind (legislation, then case law, then policy), matching
/// the source agent's pass ordering.
pub fn extract_all(text: &str) -> Vec<ExtractedCitation> {
    let mut citations = Vec::new();

    for captures in legislation_pattern().captures_iter(text) {
        let act_name = strip_leading_phrase(captures[1].trim()).to_string();
        let section = captures.get(2).map(|m| m.as_str().to_string());
        let subsection = captures.get(3).map(|m| m.as_str().to_string());

        let mut citation_text = act_name.clone();
        if let Some(section) = &section {
            citation_text.push_str(&format!(", s.{section}"));
            if let Some(subsection) = &subsection {
                citation_text.push_str(&format!("({subsection})"));
            }
        }

        citations.push(ExtractedCitation::Legislation { text: citation_text, act_name, section, subsection });
    }

    for captures in case_law_pattern().captures_iter(text) {
        let case_name = strip_leading_phrase(captures[1].trim()).to_string();
        let year = &captures[2];
        let court = &captures[3];
        let number = &captures[4];
        let neutral_citation = format!("[{year}] {court} {number}");
        let citation_text = format!("{case_name} {neutral_citation}");
        citations.push(ExtractedCitation::CaseLaw { text: citation_text, case_name, neutral_citation });
    }

    for captures in policy_pattern().captures_iter(text) {
        let document_name = strip_leading_phrase(captures[1].trim()).to_string();
        let section = captures.get(2).map(|m| m.as_str().to_string());

        let mut citation_text = document_name.clone();
        if let Some(section) = &section {
            citation_text.push_str(&format!(", {section}"));
        }

        citations.push(ExtractedCitation::Policy { text: citation_text, document_name, section });
    }

    citations
}
