//! Grammar state stack.
//!
//! A process-scoped, stack-disciplined key/value parameter set that modulates
//! text correction and translation while the engine recurses. Every
//! `push_state` records the *previous* value of each parameter it overwrites,
//! so `pop_state` restores the exact prior state. Parameters prefixed with
//! `?` are "singles": they auto-clear before the next matched rule applies.
//!
//! The translate/correct pipeline runs registered processors over fragment
//! text; which processors fire is controlled by the currently active
//! parameters, so a rule can switch a correction on for exactly the subtree
//! it recurses into.

use std::collections::BTreeMap;

/// A grammar parameter value: a boolean flag or a string.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarValue {
    Flag(bool),
    Text(String),
}

impl GrammarValue {
    fn is_set(&self) -> bool {
        !matches!(self, GrammarValue::Flag(false))
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            GrammarValue::Text(s) => Some(s),
            GrammarValue::Flag(_) => None,
        }
    }
}

/// An ordered parameter assignment, as parsed from a `grammar:` attribute.
pub type Assignment = Vec<(String, GrammarValue)>;

/// Flags steering [`Grammar::apply`] for one piece of text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFlags {
    /// Run both preprocessors and corrections.
    pub adjust: bool,
    pub preprocess: bool,
    pub correct: bool,
    pub translate: bool,
}

impl TextFlags {
    pub fn adjust() -> TextFlags {
        TextFlags { adjust: true, ..TextFlags::default() }
    }

    pub fn translate() -> TextFlags {
        TextFlags { translate: true, ..TextFlags::default() }
    }
}

/// A text processor. The second argument is the parameter's string value,
/// when it has one.
pub type Processor = fn(&str, Option<&str>) -> String;

/// A translation hook consulting locale data; `None` leaves text unchanged.
pub type Translator = fn(&str) -> Option<String>;

#[derive(Default)]
pub struct Grammar {
    parameters: BTreeMap<String, GrammarValue>,
    state_stack: Vec<Vec<(String, Option<GrammarValue>)>>,
    singles: Vec<String>,
    corrections: BTreeMap<String, Processor>,
    preprocessors: BTreeMap<String, Processor>,
    translator: Option<Translator>,
}

impl Grammar {
    pub fn new() -> Grammar {
        let mut grammar = Grammar::default();
        grammar.set_preprocessor("annotation", |text, value| match value {
            Some(v) => format!("{text}:{v}"),
            None => text.to_string(),
        });
        grammar
    }

    /// Parse a colon-separated assignment string: `key=val:flag:!negated`.
    pub fn parse_input(input: &str) -> Assignment {
        let mut assignment = Assignment::new();
        for component in input.split(':') {
            let mut parts = component.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            if key.is_empty() {
                continue;
            }
            match parts.next() {
                Some(value) => {
                    assignment.push((key.to_string(), GrammarValue::Text(value.trim().to_string())));
                }
                None => {
                    if let Some(stripped) = key.strip_prefix('!') {
                        assignment.push((stripped.to_string(), GrammarValue::Flag(false)));
                    } else {
                        assignment.push((key.to_string(), GrammarValue::Flag(true)));
                    }
                }
            }
        }
        assignment
    }

    /// Set a parameter, returning its previous value. Unset flags delete.
    pub fn set_parameter(&mut self, key: &str, value: GrammarValue) -> Option<GrammarValue> {
        let old = self.parameters.remove(key);
        if value.is_set() {
            self.parameters.insert(key.to_string(), value);
        }
        old
    }

    pub fn get_parameter(&self, key: &str) -> Option<&GrammarValue> {
        self.parameters.get(key)
    }

    /// Push an assignment, recording previous values for exact restoration.
    /// Keys prefixed with `?` are registered as singles.
    pub fn push_state(&mut self, assignment: Assignment) {
        let mut snapshot = Vec::with_capacity(assignment.len());
        for (key, value) in assignment {
            let key = match key.strip_prefix('?') {
                Some(stripped) => {
                    self.singles.push(stripped.to_string());
                    stripped.to_string()
                }
                None => key,
            };
            let old = self.set_parameter(&key, value);
            snapshot.push((key, old));
        }
        self.state_stack.push(snapshot);
    }

    /// Pop the top assignment and restore every overwritten parameter.
    pub fn pop_state(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            for (key, old) in snapshot {
                match old {
                    Some(value) => {
                        self.parameters.insert(key, value);
                    }
                    None => {
                        self.parameters.remove(&key);
                    }
                }
            }
        }
    }

    /// Clear all pending singles by pushing a state that unsets them. Called
    /// once per matched rule, before its components execute.
    pub fn process_singles(&mut self) {
        let assignment: Assignment =
            self.singles.drain(..).map(|key| (key, GrammarValue::Flag(false))).collect();
        self.push_state(assignment);
    }

    /// The current parameters as a space-separated `key:value` string. Used
    /// as the per-node side-channel annotation.
    pub fn state_string(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.parameters {
            match value {
                GrammarValue::Text(v) => pairs.push(format!("{key}:{v}")),
                GrammarValue::Flag(_) => pairs.push(key.clone()),
            }
        }
        pairs.join(" ")
    }

    pub fn set_correction(&mut self, name: &str, func: Processor) {
        self.corrections.insert(name.to_string(), func);
    }

    pub fn set_preprocessor(&mut self, name: &str, func: Processor) {
        self.preprocessors.insert(name.to_string(), func);
    }

    pub fn set_translator(&mut self, translator: Translator) {
        self.translator = Some(translator);
    }

    /// Run the translate/correct pipeline over `text` according to `flags`
    /// and the active parameters.
    pub fn apply(&mut self, text: &str, flags: TextFlags) -> String {
        let mut text = text.to_string();
        if flags.adjust || flags.preprocess {
            text = self.run_processors(&text, true);
        }
        let translate_param =
            self.parameters.get("translate").map(|v| v.is_set()).unwrap_or(false);
        if translate_param || flags.translate {
            if let Some(translator) = self.translator {
                if let Some(translated) = translator(&text) {
                    text = translated;
                }
            }
        }
        if flags.adjust || flags.correct {
            text = self.run_processors(&text, false);
        }
        text
    }

    fn run_processors(&self, text: &str, preprocess: bool) -> String {
        let funcs = if preprocess { &self.preprocessors } else { &self.corrections };
        let mut text = text.to_string();
        for (key, value) in &self.parameters {
            if let Some(func) = funcs.get(key) {
                text = func(&text, value.as_text());
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_restores_previous_values() {
        let mut grammar = Grammar::new();
        grammar.set_parameter("case", GrammarValue::Text("upper".into()));
        grammar.push_state(vec![
            ("case".into(), GrammarValue::Text("lower".into())),
            ("plural".into(), GrammarValue::Flag(true)),
        ]);
        assert_eq!(grammar.get_parameter("case"), Some(&GrammarValue::Text("lower".into())));
        grammar.pop_state();
        assert_eq!(grammar.get_parameter("case"), Some(&GrammarValue::Text("upper".into())));
        assert_eq!(grammar.get_parameter("plural"), None);
    }

    #[test]
    fn singles_auto_clear_on_next_rule() {
        let mut grammar = Grammar::new();
        grammar.push_state(vec![("?emph".into(), GrammarValue::Flag(true))]);
        assert_eq!(grammar.get_parameter("emph"), Some(&GrammarValue::Flag(true)));
        grammar.process_singles();
        assert_eq!(grammar.get_parameter("emph"), None);
        grammar.pop_state();
        assert_eq!(grammar.get_parameter("emph"), Some(&GrammarValue::Flag(true)));
    }

    #[test]
    fn parse_input_handles_all_forms() {
        let assignment = Grammar::parse_input("font=bold:plural:!translate");
        assert_eq!(
            assignment,
            vec![
                ("font".into(), GrammarValue::Text("bold".into())),
                ("plural".into(), GrammarValue::Flag(true)),
                ("translate".into(), GrammarValue::Flag(false)),
            ]
        );
    }

    #[test]
    fn apply_runs_active_corrections_only() {
        let mut grammar = Grammar::new();
        grammar.set_correction("shout", |text, _| text.to_uppercase());
        assert_eq!(grammar.apply("abc", TextFlags::adjust()), "abc");
        grammar.push_state(vec![("shout".into(), GrammarValue::Flag(true))]);
        assert_eq!(grammar.apply("abc", TextFlags::adjust()), "ABC");
    }

    #[test]
    fn state_string_lists_parameters() {
        let mut grammar = Grammar::new();
        grammar.set_parameter("font", GrammarValue::Text("bold".into()));
        grammar.set_parameter("plural", GrammarValue::Flag(true));
        assert_eq!(grammar.state_string(), "font:bold plural");
    }
}
