use serde::Deserialize;
use std::collections::HashMap;

/// The structured trailing section a fix-agent's final response carries,
/// summarising root cause, options considered and whether a fix was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub root_cause: Option<String>,
    pub fix_applied: bool,
    pub summary: Option<String>,
    pub extra: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct JsonAnalysis {
    #[serde(default)]
    root_cause: Option<String>,
    #[serde(default)]
    fix_applied: bool,
    #[serde(default)]
    summary: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

const OPEN_TAG: &str = "<ANALYSIS>";
const CLOSE_TAG: &str = "</ANALYSIS>";

/// Extracts and parses the trailing `<ANALYSIS>...</ANALYSIS>` block from a
/// session's final turn text. JSON is tried first; a legacy `key: value`
/// per-line format is the fallback.
///
/// Returns `None` if no analysis block is present at all — distinct from an
/// empty/malformed block, which still parses to a default `Analysis`.
pub fn parse_trailing_analysis(text: &str) -> Option<Analysis> {
    let start = text.rfind(OPEN_TAG)?;
    let body_start = start + OPEN_TAG.len();
    let end = text[body_start..].find(CLOSE_TAG)? + body_start;
    let body = text[body_start..end].trim();

    if body.is_empty() {
        return Some(Analysis::default());
    }

    if let Ok(parsed) = serde_json::from_str::<JsonAnalysis>(body) {
        let extra = parsed
            .extra
            .into_iter()
            .map(|(k, v)| {
                let s = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, s)
            })
            .collect();
        return Some(Analysis {
            root_cause: parsed.root_cause,
            fix_applied: parsed.fix_applied,
            summary: parsed.summary,
            extra,
        });
    }

    Some(parse_key_value(body))
}

fn parse_key_value(body: &str) -> Analysis {
    let mut analysis = Analysis::default();
    for line in body.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "root_cause" | "root cause" => analysis.root_cause = Some(value),
            "fix_applied" | "fix applied" => {
                analysis.fix_applied = value.eq_ignore_ascii_case("true") || value == "yes"
            }
            "summary" => analysis.summary = Some(value),
            _ => {
                analysis.extra.insert(key, value);
            }
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_analysis_block() {
        let text = r#"I fixed it.

<ANALYSIS>
{"root_cause": "missing null check", "fix_applied": true, "summary": "added guard"}
</ANALYSIS>"#;
        let analysis = parse_trailing_analysis(text).unwrap();
        assert_eq!(analysis.root_cause.as_deref(), Some("missing null check"));
        assert!(analysis.fix_applied);
        assert_eq!(analysis.summary.as_deref(), Some("added guard"));
    }

    #[test]
    fn falls_back_to_key_value_format() {
        let text = "done\n<ANALYSIS>\nroot_cause: off-by-one\nfix_applied: true\n</ANALYSIS>";
        let analysis = parse_trailing_analysis(text).unwrap();
        assert_eq!(analysis.root_cause.as_deref(), Some("off-by-one"));
        assert!(analysis.fix_applied);
    }

    #[test]
    fn analysis_only_outcome_is_not_applied() {
        let text = "<ANALYSIS>\nfix_applied: false\nroot_cause: unclear\n</ANALYSIS>";
        let analysis = parse_trailing_analysis(text).unwrap();
        assert!(!analysis.fix_applied);
    }

    #[test]
    fn no_block_returns_none() {
        assert!(parse_trailing_analysis("just a normal response").is_none());
    }

    #[test]
    fn uses_the_last_block_when_more_than_one_is_present() {
        let text = "<ANALYSIS>\nfix_applied: false\n</ANALYSIS>\nmore text\n<ANALYSIS>\nfix_applied: true\n</ANALYSIS>";
        let analysis = parse_trailing_analysis(text).unwrap();
        assert!(analysis.fix_applied);
    }
}
