//! `{{ expression }}` template substitution.
//!
//! | Sequence | Meaning |
//! |----------|---------|
//! | `{{expr}}` | evaluate `expr` and substitute its display form |
//! | `{{__uid}}` | a fresh unique id (ULID) |
//!
//! Placeholders are matched non-greedily, left to right.  Substitution
//! never fails: an expression that errors, or that yields null or an
//! absent value, contributes nothing.  Only the first
//! [`DEFAULT_MAX_SUBSTITUTIONS`] placeholders are evaluated; later ones are
//! removed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::engine::Engine;
use crate::expr::{RawContext, Value};

pub const DEFAULT_MAX_TEMPLATE_LENGTH: usize = 10_000;
pub const DEFAULT_MAX_SUBSTITUTIONS: usize = 50;

const UID_PLACEHOLDER: &str = "__uid";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid"));

/// Substitute every placeholder in `template` using `engine` and `ctx`.
///
/// Each placeholder is a full [`Engine::evaluate`] call: it is rate limited
/// and sees its own freshly sanitized copy of `ctx`.
pub fn interpolate(engine: &Engine, template: &str, ctx: &RawContext) -> String {
    let config = engine.config();
    let template = truncate(template, config.max_template_length);
    let mut seen = 0usize;

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            seen += 1;
            if seen > config.max_substitutions {
                return String::new();
            }
            let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
            if inner == UID_PLACEHOLDER {
                return ulid::Ulid::new().to_string();
            }
            match engine.evaluate(inner, ctx) {
                Ok(Value::Absent | Value::Null) => String::new(),
                Ok(v) => v.to_string(),
                Err(e) => {
                    tracing::debug!(expr = inner, error = %e, "placeholder dropped");
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Cut `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((cut, _)) => {
            tracing::warn!(length = s.chars().count(), max, "template truncated");
            &s[..cut]
        }
        None => s,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::expr::RawValue;

    fn ctx(pairs: &[(&str, RawValue)]) -> RawContext {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn hello_world() {
        let engine = Engine::new();
        let out = interpolate(&engine, "Hello {{name}}!", &ctx(&[("name", "World".into())]));
        assert_eq!(out, "Hello World!");
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let engine = Engine::new();
        assert_eq!(interpolate(&engine, "plain { text }", &RawContext::new()), "plain { text }");
    }

    #[test]
    fn inner_text_is_trimmed() {
        let engine = Engine::new();
        let out = interpolate(&engine, "[{{  a + 1  }}]", &ctx(&[("a", 2i64.into())]));
        assert_eq!(out, "[3]");
    }

    #[test]
    fn nullish_and_errors_become_empty() {
        let engine = Engine::new();
        let raw = ctx(&[("n", RawValue::Null)]);
        assert_eq!(interpolate(&engine, "<{{n}}|{{missing}}|{{1 / 0}}|{{eval(1)}}>", &raw), "<|||>");
    }

    #[test]
    fn non_greedy_spans() {
        let engine = Engine::new();
        let raw = ctx(&[("a", 1i64.into()), ("b", 2i64.into())]);
        assert_eq!(interpolate(&engine, "{{a}} and {{b}}", &raw), "1 and 2");
    }

    #[test]
    fn substitution_cap() {
        let engine = Engine::new();
        let template = "{{1}}".repeat(51);
        let out = interpolate(&engine, &template, &RawContext::new());
        assert_eq!(out, "1".repeat(50));
    }

    #[test]
    fn uid_is_fresh_per_placeholder() {
        let engine = Engine::new();
        let out = interpolate(&engine, "{{__uid}} {{ __uid }}", &RawContext::new());
        let ids: Vec<&str> = out.split(' ').collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].len(), 26);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn long_template_truncated() {
        let engine = Engine::with_config(EngineConfig { max_template_length: 8, ..EngineConfig::default() });
        assert_eq!(interpolate(&engine, "abcdefgh{{1}}", &RawContext::new()), "abcdefgh");
    }

    #[test]
    fn placeholders_match_direct_evaluation() {
        let engine = Engine::new();
        let mut user = RawContext::new();
        user.insert("name".into(), "Ada".into());
        user.insert("greet".into(), RawValue::function(|_| Value::Null));
        let raw = ctx(&[("user", user.into()), ("n", 2i64.into())]);

        for src in ["user.name", "n * 21", "user.greet", "user"] {
            let direct = match engine.evaluate(src, &raw) {
                Ok(Value::Absent | Value::Null) | Err(_) => String::new(),
                Ok(v) => v.to_string(),
            };
            assert_eq!(interpolate(&engine, &format!("{{{{{src}}}}}"), &raw), direct, "{src}");
        }
    }

    #[test]
    fn deeply_nested_placeholder_is_dropped() {
        let nested = format!("{}1{}", "(".repeat(65), ")".repeat(65));
        let template = format!("[{{{{{nested}}}}}]");
        let out = std::thread::spawn(move || interpolate(&Engine::new(), &template, &RawContext::new()))
            .join()
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
