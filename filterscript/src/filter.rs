//! Rule checking pipeline
//!
//! [`RuleChecker`] runs source text through tokenizing (optionally cached),
//! parsing, static checking and evaluation, and keeps a running condition
//! count across the rules it evaluates.

use crate::ast::Rule;
use crate::checker;
use crate::config::FilterConfig;
use crate::error::{InternalError, Result};
use crate::interp::{EvalError, Evaluator, UndefinedSupplier, Value, VarEnv};
use crate::lexer::{tokenize_cached, TokenCache};
use crate::logger::{Logger, TracingLogger};
use crate::parser::parse;
use crate::status::{RuleCheckerStatus, RuleException};
use std::sync::Arc;

pub struct RuleChecker {
    config: FilterConfig,
    cache: Option<Arc<dyn TokenCache>>,
    logger: Arc<dyn Logger>,
    /// Conditions used since creation or the last reset
    conditions: u32,
}

impl RuleChecker {
    pub fn new(config: FilterConfig) -> Self {
        RuleChecker {
            config,
            cache: None,
            logger: Arc::new(TracingLogger),
            conditions: 0,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Validate a rule without host data. Runs the static checker, then
    /// evaluates every branch with all builtins `Undefined` so errors hidden
    /// behind short-circuits still surface.
    pub fn check_syntax(&self, source: &str) -> std::result::Result<(), EvalError> {
        let (rule, _) = self.load(source)?;
        checker::check(&rule, self.config.checker_mode, self.config.check_unused_vars)?;

        let mut env = VarEnv::with_supplier(UndefinedSupplier);
        Evaluator::new(&mut env)
            .with_logger(self.logger.as_ref())
            .short_circuit(false)
            .run(&rule)?;
        Ok(())
    }

    /// Evaluate a rule against host data. Conditions count against the
    /// budget shared by every rule checked since the last reset.
    pub fn check_conditions(
        &mut self,
        source: &str,
        vars: &mut VarEnv,
    ) -> std::result::Result<RuleCheckerStatus, InternalError> {
        let (rule, warm_cache) = match self.load(source) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::debug!(error = %e, "rule failed to parse");
                return Ok(RuleCheckerStatus::failed(RuleException::User(e), 0));
            }
        };

        let total = self.config.effective_limit();
        let remaining = total.map(|limit| limit.saturating_sub(self.conditions));
        let mut evaluator = Evaluator::new(vars)
            .with_logger(self.logger.as_ref())
            .with_condition_limit(remaining);
        let outcome = evaluator.run(&rule);
        let mut status = evaluator.finish(outcome)?;

        self.conditions = self.conditions.saturating_add(status.conds_used);
        if let (Some(RuleException::ConditionLimit { limit }), Some(total)) =
            (&mut status.exception, total)
        {
            *limit = total;
        }
        status.warm_cache = warm_cache;

        tracing::debug!(
            result = status.result,
            conds = status.conds_used,
            total = self.conditions,
            "rule checked"
        );
        Ok(status)
    }

    /// Final value of a rule, with nested `Undefined` turned into `Null`
    pub fn evaluate_expression(
        &self,
        source: &str,
        vars: &mut VarEnv,
    ) -> std::result::Result<Value, EvalError> {
        let (rule, _) = self.load(source)?;
        let value = Evaluator::new(vars)
            .with_logger(self.logger.as_ref())
            .run(&rule)?;
        Ok(value.undefined_to_null())
    }

    /// Variable names a rule reads or writes
    pub fn get_used_vars(&self, source: &str) -> Result<Vec<String>> {
        let (rule, _) = self.load(source)?;
        Ok(checker::used_vars(&rule))
    }

    pub fn toggle_condition_limit(&mut self, enabled: bool) {
        self.config.condition_limit_enabled = enabled;
    }

    pub fn reset_condition_count(&mut self) {
        self.conditions = 0;
    }

    pub fn condition_count(&self) -> u32 {
        self.conditions
    }

    fn load(&self, source: &str) -> Result<(Rule, bool)> {
        let cache = match &self.cache {
            Some(cache) if self.config.use_token_cache => Some(cache.as_ref()),
            _ => None,
        };
        let (tokens, warm) = tokenize_cached(source, cache)?;
        Ok((parse(&tokens)?, warm))
    }
}

impl Default for RuleChecker {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
