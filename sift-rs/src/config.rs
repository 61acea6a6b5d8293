//! Engine limits and their configuration file.
//!
//! Every limit has a built-in default; a config file only overrides what it
//! names.  The file format is one setting per line:
//!
//! | Line | Action |
//! |------|--------|
//! | `name = value` | set a limit (`value` is a non-negative integer) |
//! | Lines starting with `;` or `#` | comment, ignored |
//! | Blank lines | ignored |
//!
//! Recognised names:
//!
//! | Name | Default | Meaning |
//! |------|---------|---------|
//! | `max_expression_length` | 10000 | characters per expression |
//! | `max_tokens` | 1000 | tokens per expression |
//! | `max_eval_depth` | 100 | evaluator recursion ceiling |
//! | `cache_capacity` | 100 | parsed expressions kept |
//! | `rate_limit` | 1000 | evaluations per window |
//! | `rate_window_ms` | 1000 | window length |
//! | `max_template_length` | 10000 | characters per template |
//! | `max_substitutions` | 50 | placeholders substituted per template |

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::cache;
use crate::expr::{eval, lexer};
use crate::interpolate;
use crate::limiter;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_expression_length: usize,
    pub max_tokens: usize,
    pub max_eval_depth: usize,
    pub cache_capacity: usize,
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub max_template_length: usize,
    pub max_substitutions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_expression_length: lexer::DEFAULT_MAX_LENGTH,
            max_tokens: lexer::DEFAULT_MAX_TOKENS,
            max_eval_depth: eval::DEFAULT_MAX_DEPTH,
            cache_capacity: cache::DEFAULT_CAPACITY,
            rate_limit: limiter::DEFAULT_MAX_PER_WINDOW,
            rate_window: limiter::DEFAULT_WINDOW,
            max_template_length: interpolate::DEFAULT_MAX_TEMPLATE_LENGTH,
            max_substitutions: interpolate::DEFAULT_MAX_SUBSTITUTIONS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Bad lines are reported and skipped; the returned config holds the
    /// defaults overridden by every line that did parse.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = EngineConfig::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let Some((name, value)) = line.split_once('=') else {
                errors.push(ConfigError { line: lineno, message: format!("expected `name = value`, got `{line}`") });
                continue;
            };
            if let Err(message) = config.set(name.trim(), value.trim()) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Set one limit by name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        let slot = match name {
            "max_expression_length" => &mut self.max_expression_length,
            "max_tokens" => &mut self.max_tokens,
            "max_eval_depth" => &mut self.max_eval_depth,
            "cache_capacity" => &mut self.cache_capacity,
            "rate_limit" => &mut self.rate_limit,
            "max_template_length" => &mut self.max_template_length,
            "max_substitutions" => &mut self.max_substitutions,
            "rate_window_ms" => {
                self.rate_window = Duration::from_millis(parse_count(name, value)? as u64);
                return Ok(());
            }
            _ => return Err(format!("unknown setting `{name}`")),
        };
        *slot = parse_count(name, value)?;
        Ok(())
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("`{name}` needs a non-negative integer, got `{value}`"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
