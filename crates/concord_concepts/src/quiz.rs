//! The Quiz concept: quizzes, their questions, and each question's options.
//!
//! Everything is kept in creation order. Deleting a quiz deletes its
//! questions, and deleting a question deletes its options.

use std::collections::BTreeMap;

use concord_engine::{ActionRef, Concept, QueryRef};
use concord_foundation::{Error, Fields, List, Result, Value, fields};

use crate::ids::IdGen;

/// Concept name.
pub const NAME: &str = "Quiz";

/// `Quiz.createQuiz { owner, title } -> { quiz }`
pub const CREATE_QUIZ: ActionRef = ActionRef::new(NAME, "createQuiz");
/// `Quiz.deleteQuiz { quiz } -> { quiz }`
pub const DELETE_QUIZ: ActionRef = ActionRef::new(NAME, "deleteQuiz");
/// `Quiz.addQuestion { quiz, text } -> { question }`
pub const ADD_QUESTION: ActionRef = ActionRef::new(NAME, "addQuestion");
/// `Quiz.renameQuestion { question, text } -> { question }`
pub const RENAME_QUESTION: ActionRef = ActionRef::new(NAME, "renameQuestion");
/// `Quiz.deleteQuestion { question } -> { question }`
pub const DELETE_QUESTION: ActionRef = ActionRef::new(NAME, "deleteQuestion");
/// `Quiz.addOption { question, label } -> { option }`
pub const ADD_OPTION: ActionRef = ActionRef::new(NAME, "addOption");
/// `Quiz.renameOption { option, label } -> { option }`
pub const RENAME_OPTION: ActionRef = ActionRef::new(NAME, "renameOption");
/// `Quiz.deleteOption { option } -> { option }`
pub const DELETE_OPTION: ActionRef = ActionRef::new(NAME, "deleteOption");

/// `Quiz._getQuiz { quiz } -> [{ quiz, owner, title }]`
pub const GET_QUIZ: QueryRef = QueryRef::new(NAME, "_getQuiz");
/// `Quiz._listForOwnerPayload { owner } -> [{ payload: [{ quiz, title }] }]`, always one row.
pub const LIST_FOR_OWNER_PAYLOAD: QueryRef = QueryRef::new(NAME, "_listForOwnerPayload");
/// `Quiz._collectQuizForApi { quiz } -> [{ payload }]` with nested questions and options.
pub const COLLECT_QUIZ_FOR_API: QueryRef = QueryRef::new(NAME, "_collectQuizForApi");
/// `Quiz._getQuestion { question } -> [{ question, quiz, text }]`
pub const GET_QUESTION: QueryRef = QueryRef::new(NAME, "_getQuestion");
/// `Quiz._getQuestions { quiz } -> [{ question, text }]`
pub const GET_QUESTIONS: QueryRef = QueryRef::new(NAME, "_getQuestions");
/// `Quiz._getOptions { question } -> [{ option, label }]`
pub const GET_OPTIONS: QueryRef = QueryRef::new(NAME, "_getOptions");

#[derive(Clone, Debug)]
struct QuizEntry {
    owner: String,
    title: String,
}

#[derive(Clone, Debug)]
struct QuestionEntry {
    quiz: u64,
    text: String,
}

#[derive(Clone, Debug)]
struct OptionEntry {
    question: u64,
    label: String,
}

/// Quiz authoring state.
#[derive(Debug)]
pub struct Quiz {
    quiz_ids: IdGen,
    question_ids: IdGen,
    option_ids: IdGen,
    quizzes: BTreeMap<u64, QuizEntry>,
    questions: BTreeMap<u64, QuestionEntry>,
    options: BTreeMap<u64, OptionEntry>,
}

impl Default for Quiz {
    fn default() -> Self {
        Self::new()
    }
}

impl Quiz {
    /// Creates an empty quiz store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quiz_ids: IdGen::new("q"),
            question_ids: IdGen::new("qs"),
            option_ids: IdGen::new("o"),
            quizzes: BTreeMap::new(),
            questions: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    fn quiz_key(&self, id: &str) -> Option<u64> {
        self.quiz_ids
            .parse(id)
            .filter(|k| self.quizzes.contains_key(k))
    }

    fn question_key(&self, id: &str) -> Option<u64> {
        self.question_ids
            .parse(id)
            .filter(|k| self.questions.contains_key(k))
    }

    fn option_key(&self, id: &str) -> Option<u64> {
        self.option_ids
            .parse(id)
            .filter(|k| self.options.contains_key(k))
    }

    fn require_quiz(&self, input: &Fields) -> Result<u64> {
        let id = input.get_str("quiz")?;
        self.quiz_key(id).ok_or_else(|| Error::not_found("quiz", id))
    }

    fn require_question(&self, input: &Fields) -> Result<u64> {
        let id = input.get_str("question")?;
        self.question_key(id)
            .ok_or_else(|| Error::not_found("question", id))
    }

    fn require_option(&self, input: &Fields) -> Result<u64> {
        let id = input.get_str("option")?;
        self.option_key(id).ok_or_else(|| Error::not_found("option", id))
    }

    fn questions_of(&self, quiz: u64) -> impl Iterator<Item = (u64, &QuestionEntry)> {
        self.questions
            .iter()
            .filter(move |(_, q)| q.quiz == quiz)
            .map(|(k, q)| (*k, q))
    }

    fn options_of(&self, question: u64) -> impl Iterator<Item = (u64, &OptionEntry)> {
        self.options
            .iter()
            .filter(move |(_, o)| o.question == question)
            .map(|(k, o)| (*k, o))
    }

    fn option_row(&self, key: u64, option: &OptionEntry) -> Fields {
        fields! {
            "option" => self.option_ids.format(key),
            "label" => option.label.as_str(),
        }
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    fn create_quiz(&mut self, input: &Fields) -> Result<Fields> {
        let owner = input.get_str("owner")?.to_string();
        let title = input.get_str("title")?.to_string();
        let (key, id) = self.quiz_ids.next_id();
        self.quizzes.insert(key, QuizEntry { owner, title });
        Ok(fields! { "quiz" => id })
    }

    fn delete_quiz(&mut self, input: &Fields) -> Result<Fields> {
        let key = self.require_quiz(input)?;
        let questions: Vec<u64> = self.questions_of(key).map(|(k, _)| k).collect();
        for question in questions {
            self.remove_question(question);
        }
        self.quizzes.remove(&key);
        Ok(fields! { "quiz" => self.quiz_ids.format(key) })
    }

    fn add_question(&mut self, input: &Fields) -> Result<Fields> {
        let quiz = self.require_quiz(input)?;
        let text = input.get_str("text")?.to_string();
        let (key, id) = self.question_ids.next_id();
        self.questions.insert(key, QuestionEntry { quiz, text });
        Ok(fields! { "question" => id })
    }

    fn rename_question(&mut self, input: &Fields) -> Result<Fields> {
        let key = self.require_question(input)?;
        let text = input.get_str("text")?.to_string();
        if let Some(question) = self.questions.get_mut(&key) {
            question.text = text;
        }
        Ok(fields! { "question" => self.question_ids.format(key) })
    }

    fn remove_question(&mut self, key: u64) {
        self.options.retain(|_, o| o.question != key);
        self.questions.remove(&key);
    }

    fn delete_question(&mut self, input: &Fields) -> Result<Fields> {
        let key = self.require_question(input)?;
        self.remove_question(key);
        Ok(fields! { "question" => self.question_ids.format(key) })
    }

    fn add_option(&mut self, input: &Fields) -> Result<Fields> {
        let question = self.require_question(input)?;
        let label = input.get_str("label")?.to_string();
        let (key, id) = self.option_ids.next_id();
        self.options.insert(key, OptionEntry { question, label });
        Ok(fields! { "option" => id })
    }

    fn rename_option(&mut self, input: &Fields) -> Result<Fields> {
        let key = self.require_option(input)?;
        let label = input.get_str("label")?.to_string();
        if let Some(option) = self.options.get_mut(&key) {
            option.label = label;
        }
        Ok(fields! { "option" => self.option_ids.format(key) })
    }

    fn delete_option(&mut self, input: &Fields) -> Result<Fields> {
        let key = self.require_option(input)?;
        self.options.remove(&key);
        Ok(fields! { "option" => self.option_ids.format(key) })
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    fn get_quiz(&self, args: &Fields) -> Result<Vec<Fields>> {
        let id = args.get_str("quiz")?;
        Ok(self
            .quiz_key(id)
            .and_then(|key| self.quizzes.get(&key))
            .map(|quiz| {
                vec![fields! {
                    "quiz" => id,
                    "owner" => quiz.owner.as_str(),
                    "title" => quiz.title.as_str(),
                }]
            })
            .unwrap_or_default())
    }

    fn list_for_owner_payload(&self, args: &Fields) -> Result<Vec<Fields>> {
        let owner = args.get_str("owner")?;
        let quizzes: List<Value> = self
            .quizzes
            .iter()
            .filter(|(_, q)| q.owner == owner)
            .map(|(key, q)| {
                Value::Record(fields! {
                    "quiz" => self.quiz_ids.format(*key),
                    "title" => q.title.as_str(),
                })
            })
            .collect();
        Ok(vec![fields! { "payload" => Value::List(quizzes) }])
    }

    fn collect_quiz_for_api(&self, args: &Fields) -> Result<Vec<Fields>> {
        let id = args.get_str("quiz")?;
        let Some((key, quiz)) = self
            .quiz_key(id)
            .and_then(|key| self.quizzes.get(&key).map(|q| (key, q)))
        else {
            return Ok(Vec::new());
        };

        let questions: List<Value> = self
            .questions_of(key)
            .map(|(qkey, question)| {
                let options: List<Value> = self
                    .options_of(qkey)
                    .map(|(okey, option)| Value::Record(self.option_row(okey, option)))
                    .collect();
                Value::Record(fields! {
                    "question" => self.question_ids.format(qkey),
                    "text" => question.text.as_str(),
                    "options" => Value::List(options),
                })
            })
            .collect();

        let payload = fields! {
            "quiz" => id,
            "owner" => quiz.owner.as_str(),
            "title" => quiz.title.as_str(),
            "questions" => Value::List(questions),
        };
        Ok(vec![fields! { "payload" => payload }])
    }

    fn get_question(&self, args: &Fields) -> Result<Vec<Fields>> {
        let id = args.get_str("question")?;
        Ok(self
            .question_key(id)
            .and_then(|key| self.questions.get(&key))
            .map(|question| {
                vec![fields! {
                    "question" => id,
                    "quiz" => self.quiz_ids.format(question.quiz),
                    "text" => question.text.as_str(),
                }]
            })
            .unwrap_or_default())
    }

    fn get_questions(&self, args: &Fields) -> Result<Vec<Fields>> {
        let id = args.get_str("quiz")?;
        let Some(key) = self.quiz_key(id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .questions_of(key)
            .map(|(qkey, question)| {
                fields! {
                    "question" => self.question_ids.format(qkey),
                    "text" => question.text.as_str(),
                }
            })
            .collect())
    }

    fn get_options(&self, args: &Fields) -> Result<Vec<Fields>> {
        let id = args.get_str("question")?;
        let Some(key) = self.question_key(id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .options_of(key)
            .map(|(okey, option)| self.option_row(okey, option))
            .collect())
    }
}

impl Concept for Quiz {
    fn name(&self) -> &'static str {
        NAME
    }

    fn perform(&mut self, action: &str, input: &Fields) -> Result<Fields> {
        match action {
            "createQuiz" => self.create_quiz(input),
            "deleteQuiz" => self.delete_quiz(input),
            "addQuestion" => self.add_question(input),
            "renameQuestion" => self.rename_question(input),
            "deleteQuestion" => self.delete_question(input),
            "addOption" => self.add_option(input),
            "renameOption" => self.rename_option(input),
            "deleteOption" => self.delete_option(input),
            _ => Err(Error::unknown_action(NAME, action)),
        }
    }

    fn query(&self, query: &str, args: &Fields) -> Result<Vec<Fields>> {
        match query {
            "_getQuiz" => self.get_quiz(args),
            "_listForOwnerPayload" => self.list_for_owner_payload(args),
            "_collectQuizForApi" => self.collect_quiz_for_api(args),
            "_getQuestion" => self.get_question(args),
            "_getQuestions" => self.get_questions(args),
            "_getOptions" => self.get_options(args),
            _ => Err(Error::unknown_query(NAME, query)),
        }
    }
}
