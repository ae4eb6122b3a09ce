//! Prompt-template actions
//!
//! An action is one code-generation strategy: a template with a single `{}`
//! insertion point that receives the user's question.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Insertion point marker inside a template.
pub const PLACEHOLDER: &str = "{}";

/// Template as written in configuration (label + template text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Short name shown in menus ("Optimized code")
    pub label: String,
    /// Template text with exactly one `{}`
    pub template: String,
}

impl TemplateSpec {
    pub fn new(label: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            template: template.into(),
        }
    }
}

/// The four strategies offered when a user asks for a different kind of code.
pub fn default_templates() -> Vec<TemplateSpec> {
    vec![
        TemplateSpec::new(
            "Basic code",
            "Write simple, straightforward code for the following request:\n{}",
        ),
        TemplateSpec::new(
            "Structured code with functions",
            "Write well-structured code split into functions, with proper error handling, \
             for the following request:\n{}",
        ),
        TemplateSpec::new(
            "Code with detailed comments",
            "Write code with detailed comments explaining each step for the following request:\n{}",
        ),
        TemplateSpec::new(
            "Optimized code",
            "Write optimized, efficient code and mention its complexity for the following request:\n{}",
        ),
    ]
}

/// An immutable prompt-template action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    index: usize,
    label: String,
    template: String,
}

impl Action {
    /// Create an action. The template is not checked here; see [`ActionSet::new`].
    pub fn new(index: usize, label: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            template: template.into(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn placeholder_count(&self) -> usize {
        self.template.matches(PLACEHOLDER).count()
    }
}

/// Substitute `user_text` into the action's template.
///
/// # Errors
///
/// `InvalidInput` if the text is empty or whitespace, or if the template has
/// no insertion point.
///
/// # Examples
///
/// ```
/// use coderzz_core::policy::{Action, format_prompt};
///
/// let action = Action::new(0, "python", "Generate Python code for: {}");
/// let prompt = format_prompt(&action, "sort a list").unwrap();
/// assert_eq!(prompt, "Generate Python code for: sort a list");
/// ```
pub fn format_prompt(action: &Action, user_text: &str) -> Result<String, PolicyError> {
    if user_text.trim().is_empty() {
        return Err(PolicyError::InvalidInput("query text is empty".to_string()));
    }
    if action.placeholder_count() == 0 {
        return Err(PolicyError::InvalidInput(format!(
            "template '{}' has no insertion point",
            action.label
        )));
    }
    Ok(action.template.replacen(PLACEHOLDER, user_text, 1))
}

/// Ordered, non-empty set of actions; an action's index is its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    /// Build the set from configured templates.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if there are no templates or any template does not
    /// contain exactly one insertion point.
    pub fn new(templates: &[TemplateSpec]) -> Result<Self, PolicyError> {
        if templates.is_empty() {
            return Err(PolicyError::InvalidConfig(
                "at least one prompt template is required".to_string(),
            ));
        }

        let actions: Vec<Action> = templates
            .iter()
            .enumerate()
            .map(|(i, spec)| Action::new(i, spec.label.clone(), spec.template.clone()))
            .collect();

        for action in &actions {
            let count = action.placeholder_count();
            if count != 1 {
                return Err(PolicyError::InvalidConfig(format!(
                    "template {} ('{}') must contain exactly one {} insertion point, found {}",
                    action.index, action.label, PLACEHOLDER, count
                )));
            }
        }

        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    /// Look up an action, treating a bad index as bad user input.
    pub fn require(&self, index: usize) -> Result<&Action, PolicyError> {
        self.get(index).ok_or_else(|| {
            PolicyError::InvalidInput(format!(
                "action index {} out of range (0..{})",
                index,
                self.len()
            ))
        })
    }

    /// Find an action by label, ignoring case.
    pub fn find_by_label(&self, label: &str) -> Option<&Action> {
        let wanted = label.trim();
        self.actions
            .iter()
            .find(|a| a.label.eq_ignore_ascii_case(wanted))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}

impl Default for ActionSet {
    fn default() -> Self {
        let actions = default_templates()
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Action::new(i, spec.label, spec.template))
            .collect();
        Self { actions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_prompt_substitutes_query() {
        let action = Action::new(0, "python", "Generate Python code for: {}");
        assert_eq!(
            format_prompt(&action, "sort a list").unwrap(),
            "Generate Python code for: sort a list"
        );
    }

    #[test]
    fn format_prompt_keeps_braces_in_user_text() {
        let action = Action::new(0, "basic", "Q: {}");
        assert_eq!(
            format_prompt(&action, "print {} in rust").unwrap(),
            "Q: print {} in rust"
        );
    }

    #[test]
    fn format_prompt_rejects_empty_text() {
        let action = Action::new(0, "basic", "Q: {}");
        assert!(matches!(
            format_prompt(&action, ""),
            Err(PolicyError::InvalidInput(_))
        ));
        assert!(matches!(
            format_prompt(&action, "   \n"),
            Err(PolicyError::InvalidInput(_))
        ));
    }

    #[test]
    fn format_prompt_rejects_template_without_placeholder() {
        let action = Action::new(0, "broken", "Write code");
        let err = format_prompt(&action, "sort").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidInput(ref m) if m.contains("broken")));
    }

    #[test]
    fn default_set_has_four_valid_templates() {
        let set = ActionSet::new(&default_templates()).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set, ActionSet::default());
        for (i, action) in set.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert!(format_prompt(action, "reverse a string").is_ok());
        }
        assert_eq!(set.get(3).unwrap().label(), "Optimized code");
    }

    #[test]
    fn action_set_rejects_empty_and_bad_templates() {
        assert!(matches!(
            ActionSet::new(&[]),
            Err(PolicyError::InvalidConfig(_))
        ));
        assert!(matches!(
            ActionSet::new(&[TemplateSpec::new("none", "no slot")]),
            Err(PolicyError::InvalidConfig(_))
        ));
        assert!(matches!(
            ActionSet::new(&[TemplateSpec::new("two", "{} and {}")]),
            Err(PolicyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_template_set_is_valid() {
        let set = ActionSet::new(&[TemplateSpec::new("only", "Do: {}")]).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn require_reports_out_of_range_index() {
        let set = ActionSet::default();
        assert!(set.require(3).is_ok());
        assert!(matches!(set.require(5), Err(PolicyError::InvalidInput(_))));
    }

    #[test]
    fn find_by_label_ignores_case() {
        let set = ActionSet::default();
        assert_eq!(set.find_by_label("optimized CODE").unwrap().index(), 3);
        assert!(set.find_by_label("fancy code").is_none());
    }
}
