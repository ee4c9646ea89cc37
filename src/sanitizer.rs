//! # Content Sanitizer
//!
//! Every piece of text that flows in from a scraped page or out of a model
//! response passes through here before it is stored or embedded in another
//! prompt.
//!
//! - [`sanitize`] strips script blocks, inline handlers, dangerous URI schemes
//!   and markup, decodes common entities, collapses whitespace, removes control
//!   characters and clamps the result to [`MAX_CONTENT_CHARS`].
//! - [`validate`] rejects text matching any known injection signal.
//!
//! `sanitize` is total and idempotent, and its output always passes
//! `validate`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Hard ceiling on sanitized content length, in characters
pub const MAX_CONTENT_CHARS: usize = 50_000;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bon\w+\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SCRIPT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*script").expect("valid regex"));
static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid regex"));
static DATA_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)data\s*:\s*text/html").expect("valid regex"));
static HANDLER_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon(\w+)\s*=").expect("valid regex"));
static EVAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\beval\s*\(").expect("valid regex"));
static EXPRESSION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bexpression\s*\(").expect("valid regex"));

static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)\beval\s*\(",
        r"(?i)\bexpression\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Strip unsafe markup and normalise text
pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = SCRIPT_BLOCK.replace_all(text, "").into_owned();
    out.retain(|c| !c.is_control() || c.is_whitespace());
    out = neutralize(&out);
    out = WHITESPACE.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_CONTENT_CHARS {
        out = out.chars().take(MAX_CONTENT_CHARS).collect::<String>().trim_end().to_string();
        warn!(limit = MAX_CONTENT_CHARS, "Content truncated due to length limit");
    }

    out
}

/// Check text against the fixed list of injection signals. Emptiness is not
/// an injection signal; callers that need content check for it themselves.
///
/// The handler, `eval` and `expression` signals only match at the start of a
/// word, so ordinary prose such as `Lemonade = sweet` or `retrieval (of data)`
/// passes. `<script` and `javascript:` match anywhere.
pub fn validate(text: &str) -> bool {
    for pattern in SUSPICIOUS_PATTERNS.iter() {
        if pattern.is_match(text) {
            warn!(pattern = pattern.as_str(), "Suspicious content detected and rejected");
            return false;
        }
    }
    true
}

/// Validate any serialisable value by its JSON rendering
pub fn validate_value<T: serde::Serialize>(value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(rendered) => validate(&rendered),
        Err(_) => false,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Apply every stripping rule until the text stops changing. Decoding an entity
/// or removing one fragment can splice the pieces around it into a new signal.
fn neutralize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = EVENT_HANDLER.replace_all(&current, "").into_owned();
        next = JS_SCHEME.replace_all(&next, "").into_owned();
        next = DATA_HTML.replace_all(&next, "").into_owned();
        // Tags become a space so adjacent words don't run together
        next = TAG.replace_all(&next, " ").into_owned();
        next = decode_entities(&next);
        next = SCRIPT_OPEN.replace_all(&next, "").into_owned();
        next = HANDLER_ASSIGN.replace_all(&next, "on$1 ").into_owned();
        next = EVAL_CALL.replace_all(&next, "eval ").into_owned();
        next = EXPRESSION_CALL.replace_all(&next, "expression ").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}
