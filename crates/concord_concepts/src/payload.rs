//! Response payloads assembled by guards from several concepts' queries.
//!
//! Every lookup here has an explicit default: missing vote counts are 0,
//! missing totals fall back to the activation's total (0 with no votes), and
//! a missing question reads as a nil quiz with empty text.

use std::collections::HashMap;

use concord_engine::{GuardContext, first_or};
use concord_foundation::{Fields, List, Result, Value, fields};

use crate::{activation, quiz};

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Letter shown next to the option at `index`: `A`..`Z`, then `AA`, `AB`, ...
#[must_use]
pub fn option_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        letters.push(char::from(ALPHABET[(n - 1) % 26]));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Lays out a question's options with their letters and vote tallies.
///
/// `options` are `_getOptions` rows in registration order; `votes` are
/// `_getVotes` rows of the relevant activation (empty when there is none).
#[must_use]
pub fn options_payload(options: &[Fields], votes: &[Fields]) -> Value {
    let by_option: HashMap<&str, &Fields> = votes
        .iter()
        .filter_map(|row| Some((row.get("option")?.as_str()?, row)))
        .collect();
    let fallback_total = first_or(votes, "total", Value::Int(0));

    let rows: List<Value> = options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let id = option.get("option").cloned().unwrap_or(Value::Nil);
            let tally = id.as_str().and_then(|id| by_option.get(id));
            let count = tally
                .and_then(|t| t.get("count"))
                .cloned()
                .unwrap_or(Value::Int(0));
            let total = tally
                .and_then(|t| t.get("total"))
                .cloned()
                .unwrap_or_else(|| fallback_total.clone());
            Value::Record(fields! {
                "option" => id,
                "label" => option.get("label").cloned().unwrap_or(Value::Nil),
                "letter" => option_letter(idx),
                "count" => count,
                "total" => total,
            })
        })
        .collect();
    Value::List(rows)
}

/// Payload for `GET /activations/:activation`.
///
/// # Errors
/// Returns an error if a query fails.
pub fn activation_payload(
    ctx: &GuardContext<'_>,
    activation: &str,
    question: &str,
    show_results: bool,
) -> Result<Value> {
    let rows = ctx.query(quiz::GET_QUESTION, &fields! { "question" => question })?;
    let options = ctx.query(quiz::GET_OPTIONS, &fields! { "question" => question })?;
    let votes = ctx.query(
        activation::GET_VOTES,
        &fields! { "activation" => activation },
    )?;

    Ok(Value::Record(fields! {
        "activation" => activation,
        "quiz" => first_or(&rows, "quiz", Value::Nil),
        "question" => fields! {
            "question" => question,
            "text" => first_or(&rows, "text", Value::from("")),
        },
        "showResults" => show_results,
        "options" => options_payload(&options, &votes),
    }))
}

/// Payload for `GET /display/:quiz`, or `None` when the quiz does not exist.
///
/// Each question reports its active activation, if any, with that
/// activation's tallies.
///
/// # Errors
/// Returns an error if a query fails.
pub fn display_payload(ctx: &GuardContext<'_>, quiz_id: &str) -> Result<Option<Value>> {
    let info = ctx.query(quiz::GET_QUIZ, &fields! { "quiz" => quiz_id })?;
    let Some(info) = info.first() else {
        return Ok(None);
    };

    let mut questions = Vec::new();
    for question in ctx.query(quiz::GET_QUESTIONS, &fields! { "quiz" => quiz_id })? {
        let id = question.get_str("question")?;
        let activations = ctx.query(
            activation::GET_BY_QUESTION,
            &fields! { "question" => id },
        )?;
        let active = activations
            .iter()
            .find(|a| a.get_bool("isActive").unwrap_or(false));

        let votes = match active {
            Some(a) => ctx.query(
                activation::GET_VOTES,
                &fields! { "activation" => a.require("activation")?.clone() },
            )?,
            None => Vec::new(),
        };
        let options = ctx.query(quiz::GET_OPTIONS, &fields! { "question" => id })?;

        questions.push(Value::Record(fields! {
            "question" => id,
            "text" => question.require("text")?.clone(),
            "activation" => active.and_then(|a| a.get("activation")).cloned(),
            "showResults" => active
                .and_then(|a| a.get("showResults"))
                .cloned()
                .unwrap_or(Value::Bool(false)),
            "options" => options_payload(&options, &votes),
        }));
    }

    Ok(Some(Value::Record(fields! {
        "quiz" => quiz_id,
        "title" => info.require("title")?.clone(),
        "questions" => questions,
    })))
}
