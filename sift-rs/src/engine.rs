//! The host-facing engine.
//!
//! An [`Engine`] ties the pipeline together: every call is first admitted
//! by the rate limiter, the parsed expression is fetched from (or added to)
//! the cache, and the AST is evaluated against a freshly sanitized context.
//!
//! Cache and limiter share one mutex.  The lock covers bookkeeping only;
//! lexing, parsing and evaluation run with it released, so an `Engine` can
//! be shared across threads behind an `Arc`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::{CacheStats, ExprCache};
use crate::config::EngineConfig;
use crate::error::ExprError;
use crate::expr::{parse, sanitize, Evaluator, Expr, Lexer, RawContext, Value};
use crate::interpolate;
use crate::limiter::RateLimiter;

/// The result of [`Engine::evaluate_safe`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub success: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl From<Result<Value, ExprError>> for EvalOutcome {
    fn from(r: Result<Value, ExprError>) -> Self {
        match r {
            Ok(v) => EvalOutcome { success: true, value: Some(v), error: None },
            Err(e) => EvalOutcome { success: false, value: None, error: Some(e.to_string()) },
        }
    }
}

#[derive(Debug)]
struct EngineState {
    cache: ExprCache,
    limiter: RateLimiter,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let state = EngineState {
            cache: ExprCache::new(config.cache_capacity),
            limiter: RateLimiter::new(config.rate_limit, config.rate_window),
        };
        Engine { config, state: Mutex::new(state) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `src` against `ctx`.
    ///
    /// A call refused by the rate limiter yields `Ok(Value::Absent)`.
    pub fn evaluate(&self, src: &str, ctx: &RawContext) -> Result<Value, ExprError> {
        if !self.lock().limiter.admit() {
            tracing::warn!(limit = self.config.rate_limit, "evaluation rate limit exceeded");
            return Ok(Value::Absent);
        }
        let ast = self.parse_cached(src)?;
        let ctx = sanitize(ctx);
        Evaluator::new(&ctx).max_depth(self.config.max_eval_depth).eval(&ast)
    }

    /// Like [`evaluate`](Self::evaluate), but never fails.
    pub fn evaluate_safe(&self, src: &str, ctx: &RawContext) -> EvalOutcome {
        self.evaluate(src, ctx).into()
    }

    /// Substitute every `{{expr}}` placeholder in `template`.
    pub fn interpolate(&self, template: &str, ctx: &RawContext) -> String {
        interpolate::interpolate(self, template, ctx)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock().cache.stats()
    }

    pub fn clear_cache(&self) {
        self.lock().cache.clear();
    }

    /// Fetch the AST for `src`, parsing and caching it on a miss.
    fn parse_cached(&self, src: &str) -> Result<Arc<Expr>, ExprError> {
        if let Some(ast) = self.lock().cache.get(src) {
            return Ok(ast);
        }
        let tokens = Lexer::new(src)
            .max_length(self.config.max_expression_length)
            .max_tokens(self.config.max_tokens)
            .tokenize()?;
        let ast = Arc::new(parse(tokens)?);
        self.lock().cache.put(src, Arc::clone(&ast));
        Ok(ast)
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // Every update under the lock is a single step; poison carries no torn state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
