//! Synchronization rules and the rule registry.
//!
//! A [`SyncRule`] is `when` (trigger patterns), an optional guard, and `then`
//! (follow-up action templates). Rules are built from a factory that receives
//! fresh [`Vars`], so variables are never shared between rule instances.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use concord_foundation::{Error, Fields, Frame, List, Result, Value, Var, Vars};

use crate::concept::ActionRef;
use crate::guard::{Frames, GuardContext};
use crate::pattern::{ActionPattern, Term};

// =============================================================================
// Expressions
// =============================================================================

/// A follow-up field expression, evaluated against a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// A literal or a variable.
    Term(Term),
    /// A record built from nested expressions.
    Record(Vec<(Arc<str>, Expr)>),
    /// A list built from nested expressions.
    List(Vec<Expr>),
}

impl Expr {
    /// Builds a record expression from `(field, expr)` pairs.
    #[must_use]
    pub fn record<K, E>(entries: impl IntoIterator<Item = (K, E)>) -> Self
    where
        K: Into<Arc<str>>,
        E: Into<Expr>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, e)| (k.into(), e.into()))
                .collect(),
        )
    }

    /// Substitutes bound variables and builds the concrete value.
    ///
    /// # Errors
    /// Returns [`UnboundVariable`](concord_foundation::ErrorKind::UnboundVariable)
    /// if a referenced variable is not bound in `frame`.
    pub fn eval(&self, frame: &Frame) -> Result<Value> {
        match self {
            Self::Term(Term::Lit(v)) => Ok(v.clone()),
            Self::Term(Term::Var(var)) => frame.require(var).cloned(),
            Self::Record(entries) => {
                let mut fields = Fields::new();
                for (k, e) in entries {
                    fields = fields.with(k.clone(), e.eval(frame)?);
                }
                Ok(Value::Record(fields))
            }
            Self::List(items) => items
                .iter()
                .map(|e| e.eval(frame))
                .collect::<Result<List<Value>>>()
                .map(Value::List),
        }
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a Var>) {
        match self {
            Self::Term(Term::Var(v)) => out.push(v),
            Self::Term(Term::Lit(_)) => {}
            Self::Record(entries) => entries.iter().for_each(|(_, e)| e.collect_vars(out)),
            Self::List(items) => items.iter().for_each(|e| e.collect_vars(out)),
        }
    }
}

impl From<Term> for Expr {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

macro_rules! expr_from_term {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Self::Term(Term::from(value))
                }
            }
        )*
    };
}

expr_from_term!(Var, &Var, Value, &str, bool, i64);

// =============================================================================
// Action Template
// =============================================================================

/// A follow-up action to invoke once per surviving frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionTemplate {
    /// The action to invoke.
    pub action: ActionRef,
    /// Input field expressions.
    pub input: Vec<(Arc<str>, Expr)>,
    /// Output fields folded back into the frame after the call.
    pub output: Vec<(Arc<str>, Var)>,
}

impl ActionTemplate {
    /// Creates a template with no fields.
    #[must_use]
    pub fn new(action: ActionRef) -> Self {
        Self {
            action,
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Adds an input field.
    #[must_use]
    pub fn input(mut self, field: impl Into<Arc<str>>, expr: impl Into<Expr>) -> Self {
        self.input.push((field.into(), expr.into()));
        self
    }

    /// Binds an output field of the call's result to a variable.
    #[must_use]
    pub fn output(mut self, field: impl Into<Arc<str>>, var: &Var) -> Self {
        self.output.push((field.into(), var.clone()));
        self
    }

    /// Evaluates the input fields under `frame`.
    ///
    /// # Errors
    /// Returns an error if any input expression references an unbound variable.
    pub fn realize(&self, frame: &Frame) -> Result<Fields> {
        let mut fields = Fields::new();
        for (field, expr) in &self.input {
            fields = fields.with(field.clone(), expr.eval(frame)?);
        }
        Ok(fields)
    }
}

// =============================================================================
// Sync Rule
// =============================================================================

/// Guard function: candidate frames in, surviving frames out.
pub type GuardFn = dyn Fn(Frames, &GuardContext<'_>) -> Result<Frames> + Send + Sync;

/// A declarative synchronization between concepts.
#[derive(Clone)]
pub struct SyncRule {
    /// Unique rule name.
    pub name: Arc<str>,
    /// Trigger patterns; shared variables are join keys.
    pub when: Vec<ActionPattern>,
    /// Optional enrichment/filter step.
    pub guard: Option<Arc<GuardFn>>,
    /// Follow-up actions, invoked in order per surviving frame.
    pub then: Vec<ActionTemplate>,
}

impl SyncRule {
    /// Starts a rule with the given name.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            when: Vec::new(),
            guard: None,
            then: Vec::new(),
        }
    }

    /// Adds a trigger pattern.
    #[must_use]
    pub fn when(mut self, pattern: ActionPattern) -> Self {
        self.when.push(pattern);
        self
    }

    /// Sets the guard.
    #[must_use]
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(Frames, &GuardContext<'_>) -> Result<Frames> + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Adds a follow-up action.
    #[must_use]
    pub fn then(mut self, template: ActionTemplate) -> Self {
        self.then.push(template);
        self
    }

    /// Distinct actions this rule's trigger observes.
    #[must_use]
    pub fn trigger_actions(&self) -> Vec<ActionRef> {
        let mut actions: Vec<ActionRef> = self.when.iter().map(|p| p.action).collect();
        actions.sort_unstable();
        actions.dedup();
        actions
    }

    /// Checks the rule is well formed.
    ///
    /// # Errors
    /// Returns [`InvalidRule`](concord_foundation::ErrorKind::InvalidRule) for an
    /// empty `when` or `then`, a field constrained twice within one pattern, or
    /// (for rules without a guard) a follow-up variable nothing can bind.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::invalid_rule(self.name.as_ref(), reason));

        if self.when.is_empty() {
            return invalid("rule has no trigger patterns".into());
        }
        if self.then.is_empty() {
            return invalid("rule has no follow-up actions".into());
        }

        for pattern in &self.when {
            for side in [&pattern.input, &pattern.output] {
                let mut seen = HashSet::new();
                for (field, _) in side {
                    if !seen.insert(field) {
                        return invalid(format!(
                            "field {field} constrained twice in pattern {}",
                            pattern.action
                        ));
                    }
                }
            }
        }

        if self.guard.is_none() {
            let mut bound: HashSet<&Var> = self.when.iter().flat_map(ActionPattern::vars).collect();
            for template in &self.then {
                let mut used = Vec::new();
                for (_, expr) in &template.input {
                    expr.collect_vars(&mut used);
                }
                if let Some(var) = used.into_iter().find(|v| !bound.contains(v)) {
                    return invalid(format!(
                        "variable {var} in follow-up {} is never bound",
                        template.action
                    ));
                }
                bound.extend(template.output.iter().map(|(_, v)| v));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for SyncRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRule")
            .field("name", &self.name)
            .field("when", &self.when)
            .field("guard", &self.guard.is_some())
            .field("then", &self.then)
            .finish()
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// Index of a rule within a [`RuleSet`]; stable across replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// The active rules, in registration order, indexed by trigger action.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Arc<SyncRule>>,
    by_name: BTreeMap<Arc<str>, RuleId>,
    by_action: BTreeMap<ActionRef, Vec<RuleId>>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a rule. A rule with an existing name replaces the
    /// old one and keeps its position.
    ///
    /// # Errors
    /// Returns an error if the rule fails validation.
    pub fn register(&mut self, rule: SyncRule) -> Result<RuleId> {
        rule.validate()?;
        let rule = Arc::new(rule);

        let id = if let Some(&id) = self.by_name.get(&rule.name) {
            self.rules[id.0] = rule;
            id
        } else {
            let id = RuleId(self.rules.len());
            self.by_name.insert(rule.name.clone(), id);
            self.rules.push(rule);
            id
        };

        self.rebuild_index();
        Ok(id)
    }

    /// Builds a rule from a factory given fresh variables, then registers it.
    ///
    /// # Errors
    /// Returns an error if the rule fails validation.
    pub fn register_with(&mut self, factory: impl FnOnce(&mut Vars) -> SyncRule) -> Result<RuleId> {
        let mut vars = Vars::new();
        self.register(factory(&mut vars))
    }

    fn rebuild_index(&mut self) {
        self.by_action.clear();
        for (i, rule) in self.rules.iter().enumerate() {
            for action in rule.trigger_actions() {
                self.by_action.entry(action).or_default().push(RuleId(i));
            }
        }
    }

    /// Gets a rule by id.
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Arc<SyncRule>> {
        self.rules.get(id.0)
    }

    /// Looks up a rule id by name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    /// Rules with a trigger pattern on any of `actions`, in registration order.
    #[must_use]
    pub fn triggered_by(&self, actions: impl IntoIterator<Item = ActionRef>) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = actions
            .into_iter()
            .filter_map(|a| self.by_action.get(&a))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Iterates rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Arc<SyncRule>)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Removes every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.by_name.clear();
        self.by_action.clear();
    }
}
