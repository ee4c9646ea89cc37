//! Source priority table. Lower numbers rank higher.

/// Priority for any source not in the academic table
pub const DEFAULT_PRIORITY: u32 = 10;

/// Known academic and encyclopedic sources
pub const ACADEMIC_SOURCES: &[(&str, u32)] = &[
    ("wikipedia.org", 1),
    ("khanacademy.org", 2),
    ("pubmed.ncbi.nlm.nih.gov", 2),
    ("arxiv.org", 3),
    (".edu", 2),
];

/// Priority of a domain or URL: the first matching table entry, else the default
pub fn source_priority(source: &str) -> u32 {
    let source = source.to_lowercase();
    ACADEMIC_SOURCES
        .iter()
        .find(|(domain, _)| source.contains(domain))
        .map(|(_, priority)| *priority)
        .unwrap_or(DEFAULT_PRIORITY)
}

pub fn is_academic_source(source: &str) -> bool {
    let source = source.to_lowercase();
    ACADEMIC_SOURCES
        .iter()
        .any(|(domain, _)| source.contains(domain))
}
