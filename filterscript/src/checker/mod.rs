//! Static rule checker
//!
//! Validates a parsed rule without any variable values. Conditional
//! constructs (`&`, `|`, `if`/`?:`) are joined through a [`BranchPolicy`]
//! that decides which variables count as defined once control flow merges.
//! The first problem found is reported; nothing is batched.

use crate::ast::{BinOp, Expr, Rule, Spanned};
use crate::builtins;
use crate::error::{ExceptionId, Result, UserVisibleException};
use crate::keywords;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// How assignments inside conditional branches are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerMode {
    /// Assigned on any branch is enough
    #[default]
    Conservative,
    /// Must be assigned on every branch
    Liberal,
}

impl fmt::Display for CheckerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckerMode::Conservative => write!(f, "conservative"),
            CheckerMode::Liberal => write!(f, "liberal"),
        }
    }
}

/// Names known to be assigned at some point of the walk
pub type VarSet = BTreeSet<String>;

/// Joins the defined-variable sets of alternative branches
pub trait BranchPolicy {
    fn join(&self, branches: Vec<VarSet>) -> VarSet;
}

/// Union of the branches
#[derive(Debug, Clone, Copy, Default)]
pub struct Conservative;

/// Intersection of the branches
#[derive(Debug, Clone, Copy, Default)]
pub struct Liberal;

impl BranchPolicy for Conservative {
    fn join(&self, branches: Vec<VarSet>) -> VarSet {
        branches.into_iter().flatten().collect()
    }
}

impl BranchPolicy for Liberal {
    fn join(&self, branches: Vec<VarSet>) -> VarSet {
        let mut branches = branches.into_iter();
        let Some(mut joined) = branches.next() else {
            return VarSet::new();
        };
        for branch in branches {
            joined.retain(|name| branch.contains(name));
        }
        joined
    }
}

/// Check a rule. With `check_unused_vars`, a variable whose last
/// assignment is never read afterwards is reported as `unusedvars`.
pub fn check(rule: &Rule, mode: CheckerMode, check_unused_vars: bool) -> Result<()> {
    match mode {
        CheckerMode::Conservative => Checker::new(Conservative, check_unused_vars).run(rule),
        CheckerMode::Liberal => Checker::new(Liberal, check_unused_vars).run(rule),
    }
}

/// Every variable name a rule reads or writes, lowercase, in order of first
/// appearance
pub fn used_vars(rule: &Rule) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut pending: Vec<&Spanned<Expr>> = rule.body.iter().collect();

    while let Some(expr) = pending.pop() {
        let name = match &expr.node {
            Expr::Var(name) => Some(name.as_str()),
            other => other.assigned_name(),
        };
        if let Some(name) = name {
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }
        pending.extend(expr.node.children().into_iter().rev());
    }

    names
}

struct Checker<P> {
    policy: P,
    check_unused: bool,
    defined: VarSet,
    /// Assigned and not read since: name -> position of the last assignment
    unread: HashMap<String, usize>,
}

impl<P: BranchPolicy> Checker<P> {
    fn new(policy: P, check_unused: bool) -> Self {
        Checker {
            policy,
            check_unused,
            defined: VarSet::new(),
            unread: HashMap::new(),
        }
    }

    fn run(mut self, rule: &Rule) -> Result<()> {
        if let Some(body) = &rule.body {
            self.walk(body)?;
        }
        if !self.check_unused || self.unread.is_empty() {
            return Ok(());
        }

        let mut unused: Vec<(String, usize)> = self.unread.into_iter().collect();
        unused.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let position = unused[0].1;
        Err(UserVisibleException::new(
            ExceptionId::UnusedVars,
            position,
            unused.into_iter().map(|(name, _)| name).collect(),
        ))
    }

    fn walk(&mut self, expr: &Spanned<Expr>) -> Result<()> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.walk_inner(expr))
    }

    fn walk_inner(&mut self, expr: &Spanned<Expr>) -> Result<()> {
        let pos = expr.span.start;
        match &expr.node {
            Expr::Var(name) => self.read(name, pos),

            Expr::Assign { name, value } => {
                self.walk(value)?;
                self.check_writable(name, pos)?;
                self.defined.insert(name.clone());
                self.unread.insert(name.clone(), pos);
                Ok(())
            }

            Expr::Append { name, value } => {
                self.modify(name, pos)?;
                self.walk(value)
            }

            Expr::IndexAssign { name, index, value } => {
                self.modify(name, pos)?;
                self.walk(index)?;
                self.walk(value)
            }

            Expr::Call { func, args } => {
                let function = builtins::lookup(func).ok_or_else(|| {
                    UserVisibleException::new(ExceptionId::UnknownFunction, pos, vec![func.clone()])
                })?;
                function.check_arity(args.len(), pos)?;
                args.iter().try_for_each(|arg| self.walk(arg))
            }

            Expr::Binary {
                left,
                op: BinOp::And | BinOp::Or,
                right,
            } => {
                self.walk(left)?;
                let skipped = self.defined.clone();
                self.walk(right)?;
                let taken = std::mem::take(&mut self.defined);
                self.defined = self.policy.join(vec![taken, skipped]);
                Ok(())
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk(cond)?;
                let before = self.defined.clone();
                self.walk(then_branch)?;
                let after_then = std::mem::replace(&mut self.defined, before);
                if let Some(else_branch) = else_branch {
                    self.walk(else_branch)?;
                }
                let after_else = std::mem::take(&mut self.defined);
                self.defined = self.policy.join(vec![after_then, after_else]);
                Ok(())
            }

            other => other.children().into_iter().try_for_each(|child| self.walk(child)),
        }
    }

    fn read(&mut self, name: &str, pos: usize) -> Result<()> {
        if builtins::is_function(name) {
            return Err(Self::error(ExceptionId::UseBuiltin, pos, name));
        }
        if keywords::is_disabled_var(name) {
            return Err(Self::error(ExceptionId::DisabledVar, pos, name));
        }
        if keywords::is_builtin_var(name) {
            return Ok(());
        }
        if !self.defined.contains(name) {
            return Err(Self::error(ExceptionId::UnrecognisedVar, pos, name));
        }
        self.unread.remove(name);
        Ok(())
    }

    /// Element writes need an existing user array and count as a use
    fn modify(&mut self, name: &str, pos: usize) -> Result<()> {
        self.check_writable(name, pos)?;
        if !self.defined.contains(name) {
            return Err(Self::error(ExceptionId::UnrecognisedVar, pos, name));
        }
        self.unread.remove(name);
        Ok(())
    }

    fn check_writable(&self, name: &str, pos: usize) -> Result<()> {
        if keywords::is_builtin_var(name) || builtins::is_function(name) {
            return Err(Self::error(ExceptionId::OverrideBuiltin, pos, name));
        }
        Ok(())
    }

    fn error(id: ExceptionId, pos: usize, name: &str) -> UserVisibleException {
        UserVisibleException::new(id, pos, vec![name.to_string()])
    }
}
