//! Side tables filled by the constant extractor.
//!
//! Quoted content never reaches the grammar: the extractor interns it here
//! and leaves a placeholder (`"0"`, `` `1` ``, `@2@`) whose digits index into
//! the matching list. The tables are append-only while parsing and read-only
//! once the program is built.

use std::rc::Rc;

use crate::CodeSlice;

/// A regular expression literal, `/pattern/flags`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexLiteral {
    pub pattern: Rc<str>,
    pub flags: Rc<str>,
}

/// A template literal split at its interpolations.
///
/// `quasis.len() == expressions.len() + 1`. Each expression is the already
/// extracted source of one `${...}` span, cut from its own buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateLiteral {
    pub quasis: Vec<Rc<str>>,
    pub expressions: Vec<CodeSlice>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constants {
    strings: Vec<Rc<str>>,
    regexes: Vec<RegexLiteral>,
    templates: Vec<TemplateLiteral>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string literal's decoded value, returning its index.
    pub fn push_string(&mut self, value: impl Into<Rc<str>>) -> usize {
        self.strings.push(value.into());
        self.strings.len() - 1
    }

    pub fn push_regex(&mut self, regex: RegexLiteral) -> usize {
        self.regexes.push(regex);
        self.regexes.len() - 1
    }

    pub fn push_template(&mut self, template: TemplateLiteral) -> usize {
        self.templates.push(template);
        self.templates.len() - 1
    }

    pub fn string(&self, index: usize) -> Option<&Rc<str>> {
        self.strings.get(index)
    }

    pub fn regex(&self, index: usize) -> Option<&RegexLiteral> {
        self.regexes.get(index)
    }

    pub fn template(&self, index: usize) -> Option<&TemplateLiteral> {
        self.templates.get(index)
    }

    pub fn strings(&self) -> &[Rc<str>] {
        &self.strings
    }

    pub fn regexes(&self) -> &[RegexLiteral] {
        &self.regexes
    }

    pub fn templates(&self) -> &[TemplateLiteral] {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn indices_are_positional_per_table() {
        let mut constants = Constants::new();
        assert_eq!(constants.push_string("a"), 0);
        assert_eq!(constants.push_string("b"), 1);
        assert_eq!(
            constants.push_regex(RegexLiteral {
                pattern: "x+".into(),
                flags: "g".into(),
            }),
            0
        );
        assert_eq!(constants.string(1).map(|s| &**s), Some("b"));
        assert_eq!(constants.regex(0).map(|r| &*r.flags), Some("g"));
        assert!(constants.template(0).is_none());
    }
}
