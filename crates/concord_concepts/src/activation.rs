//! The Activation concept: live polls over a question, and the votes cast in them.
//!
//! An activation only knows its question by id. At most one activation per
//! question is active at a time; activating a question again deactivates the
//! previous one. Each user holds at most one vote per activation.

use std::collections::BTreeMap;

use concord_engine::{ActionRef, Concept, QueryRef};
use concord_foundation::{Error, Fields, Result, fields};
use tracing::debug;

use crate::ids::IdGen;

/// Concept name.
pub const NAME: &str = "Activation";

/// `Activation.activate { question } -> { activation }`
pub const ACTIVATE: ActionRef = ActionRef::new(NAME, "activate");
/// `Activation.deactivate { activation } -> { activation }`
pub const DEACTIVATE: ActionRef = ActionRef::new(NAME, "deactivate");
/// `Activation.show { activation } -> { activation }`
pub const SHOW: ActionRef = ActionRef::new(NAME, "show");
/// `Activation.hide { activation } -> { activation }`
pub const HIDE: ActionRef = ActionRef::new(NAME, "hide");
/// `Activation.choose { activation, user, option } -> { activation }`
pub const CHOOSE: ActionRef = ActionRef::new(NAME, "choose");

/// `Activation._getActivation { activation } -> [{ activation, question, showResults, isActive }]`
pub const GET_ACTIVATION: QueryRef = QueryRef::new(NAME, "_getActivation");
/// `Activation._getVotes { activation } -> [{ option, count, total }]`
pub const GET_VOTES: QueryRef = QueryRef::new(NAME, "_getVotes");
/// `Activation._getByQuestion { question } -> [{ activation, isActive, showResults }]`
pub const GET_BY_QUESTION: QueryRef = QueryRef::new(NAME, "_getByQuestion");

#[derive(Clone, Debug)]
struct Entry {
    question: String,
    active: bool,
    show_results: bool,
    // user -> option
    votes: BTreeMap<String, String>,
}

/// Poll activation state.
#[derive(Debug)]
pub struct Activation {
    ids: IdGen,
    entries: BTreeMap<u64, Entry>,
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}

impl Activation {
    /// Creates an empty activation store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdGen::new("a"),
            entries: BTreeMap::new(),
        }
    }

    fn entry_mut(&mut self, input: &Fields) -> Result<(u64, &mut Entry)> {
        let id = input.get_str("activation")?;
        let missing = || Error::not_found("activation", id);
        let key = self.ids.parse(id).ok_or_else(missing)?;
        let entry = self.entries.get_mut(&key).ok_or_else(missing)?;
        Ok((key, entry))
    }

    fn entry(&self, args: &Fields) -> Result<Option<(u64, &Entry)>> {
        let id = args.get_str("activation")?;
        Ok(self
            .ids
            .parse(id)
            .and_then(|k| self.entries.get(&k).map(|e| (k, e))))
    }

    fn activate(&mut self, input: &Fields) -> Result<Fields> {
        let question = input.get_str("question")?;
        for entry in self.entries.values_mut() {
            if entry.question == question && entry.active {
                entry.active = false;
            }
        }
        let (key, id) = self.ids.next_id();
        self.entries.insert(
            key,
            Entry {
                question: question.to_string(),
                active: true,
                show_results: false,
                votes: BTreeMap::new(),
            },
        );
        debug!(activation = %id, question, "question activated");
        Ok(fields! { "activation" => id })
    }

    fn update(&mut self, input: &Fields, f: impl FnOnce(&mut Entry)) -> Result<Fields> {
        let (key, entry) = self.entry_mut(input)?;
        f(entry);
        Ok(fields! { "activation" => self.ids.format(key) })
    }

    fn choose(&mut self, input: &Fields) -> Result<Fields> {
        let user = input.get_str("user")?.to_string();
        let option = input.get_str("option")?.to_string();
        let (key, entry) = self.entry_mut(input)?;
        if !entry.active {
            return Err(Error::invalid_argument(format!(
                "activation {} is not active",
                input.get_str("activation")?
            )));
        }
        entry.votes.insert(user, option);
        Ok(fields! { "activation" => self.ids.format(key) })
    }

    fn get_activation(&self, args: &Fields) -> Result<Vec<Fields>> {
        Ok(self
            .entry(args)?
            .map(|(key, entry)| {
                vec![fields! {
                    "activation" => self.ids.format(key),
                    "question" => entry.question.as_str(),
                    "showResults" => entry.show_results,
                    "isActive" => entry.active,
                }]
            })
            .unwrap_or_default())
    }

    fn get_votes(&self, args: &Fields) -> Result<Vec<Fields>> {
        let Some((_, entry)) = self.entry(args)? else {
            return Ok(Vec::new());
        };
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for option in entry.votes.values() {
            *counts.entry(option.as_str()).or_default() += 1;
        }
        let total: i64 = counts.values().sum();
        Ok(counts
            .into_iter()
            .map(|(option, count)| {
                fields! {
                    "option" => option,
                    "count" => count,
                    "total" => total,
                }
            })
            .collect())
    }

    fn get_by_question(&self, args: &Fields) -> Result<Vec<Fields>> {
        let question = args.get_str("question")?;
        Ok(self
            .entries
            .iter()
            .filter(|(_, e)| e.question == question)
            .map(|(key, entry)| {
                fields! {
                    "activation" => self.ids.format(*key),
                    "isActive" => entry.active,
                    "showResults" => entry.show_results,
                }
            })
            .collect())
    }
}

impl Concept for Activation {
    fn name(&self) -> &'static str {
        NAME
    }

    fn perform(&mut self, action: &str, input: &Fields) -> Result<Fields> {
        match action {
            "activate" => self.activate(input),
            "deactivate" => self.update(input, |e| e.active = false),
            "show" => self.update(input, |e| e.show_results = true),
            "hide" => self.update(input, |e| e.show_results = false),
            "choose" => self.choose(input),
            _ => Err(Error::unknown_action(NAME, action)),
        }
    }

    fn query(&self, query: &str, args: &Fields) -> Result<Vec<Fields>> {
        match query {
            "_getActivation" => self.get_activation(args),
            "_getVotes" => self.get_votes(args),
            "_getByQuestion" => self.get_by_question(args),
            _ => Err(Error::unknown_query(NAME, query)),
        }
    }
}
