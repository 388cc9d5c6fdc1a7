//! Form binding and validation.
//!
//! Each form validates every field; a field reports only the first constraint
//! it fails. Submitted fields the form does not declare are ignored. Group and
//! username limits are `validator` derives over trimmed copies of the input.

use crate::models::{Group, GroupInput, PostInput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_SLUG: &str =
    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only \
     letters, numbers, and @/./+/-/_ characters.";

/// Limits enforced by the `length` derives below.
pub const GROUP_TITLE_MAX_CHARS: usize = 200;
pub const GROUP_SLUG_MAX_CHARS: usize = 50;
pub const USERNAME_MAX_CHARS: usize = 150;

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Record the outcome of one field check, returning the cleaned value.
    fn check<T>(&mut self, field: &str, outcome: Result<T, String>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

fn required(value: Option<&str>) -> Result<&str, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(REQUIRED.to_string()),
    }
}

/// Trimmed copy of a submitted value; blank counts as missing.
fn cleaned(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn slug_shape(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug"))
    }
}

fn username_shape(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

/// Cleaned fields checked by `validator` derives.
trait CleanedFields: Validate {
    fn value(&self, field: &str) -> Option<&str>;

    /// Run the derived checks, keeping the first failure of each field:
    /// missing before too long before malformed.
    fn check(&self) -> Result<(), FormErrors> {
        let report = match self.validate() {
            Ok(()) => return Ok(()),
            Err(report) => report,
        };

        let mut errors = FormErrors::new();
        for (field, failures) in report.field_errors() {
            let field = field.to_string();
            if let Some(first) = failures.iter().min_by_key(|e| precedence(&e.code)) {
                errors.add(field.clone(), message_for(first, self.value(&field)));
            }
        }
        Err(errors)
    }
}

fn precedence(code: &str) -> u8 {
    match code {
        "required" => 0,
        "length" => 1,
        _ => 2,
    }
}

fn message_for(error: &ValidationError, value: Option<&str>) -> String {
    match error.code.as_ref() {
        "required" => REQUIRED.to_string(),
        "length" => {
            let max = error
                .params
                .get("max")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or_default();
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max,
                value.map_or(0, |v| v.chars().count())
            )
        }
        "invalid_slug" => INVALID_SLUG.to_string(),
        "invalid_username" => INVALID_USERNAME.to_string(),
        code => code.to_string(),
    }
}

#[derive(Debug, Validate)]
struct GroupFields {
    #[validate(required, length(max = 200))]
    title: Option<String>,
    #[validate(required, length(max = 50), custom(function = "slug_shape"))]
    slug: Option<String>,
    #[validate(required)]
    description: Option<String>,
}

impl CleanedFields for GroupFields {
    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "title" => self.title.as_deref(),
            "slug" => self.slug.as_deref(),
            "description" => self.description.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Validate)]
struct UsernameField {
    #[validate(required, length(max = 150), custom(function = "username_shape"))]
    username: Option<String>,
}

impl CleanedFields for UsernameField {
    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "username" => self.username.as_deref(),
            _ => None,
        }
    }
}

/// Submitted post fields (`text`, `group`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: Option<String>,
    /// Group id as submitted; empty means "no group".
    #[serde(default)]
    pub group: Option<String>,
}

impl PostForm {
    /// Form pre-filled from an existing post.
    pub fn initial(text: &str, group_id: Option<i64>) -> Self {
        Self {
            text: Some(text.to_string()),
            group: group_id.map(|id| id.to_string()),
        }
    }

    /// Validate against the available group choices.
    pub fn validate(&self, groups: &[Group]) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let text = errors.check("text", required(self.text.as_deref()).map(str::to_string));

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => Some(None),
            Some(raw) => {
                let choice = raw
                    .parse::<i64>()
                    .ok()
                    .filter(|id| groups.iter().any(|g| g.id == *id))
                    .map(Some)
                    .ok_or_else(|| INVALID_CHOICE.to_string());
                errors.check("group", choice)
            }
        };

        match (text, group_id) {
            (Some(text), Some(group_id)) if errors.is_empty() => Ok(PostInput { text, group_id }),
            _ => Err(errors),
        }
    }
}

/// Submitted comment fields (`text`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: Option<String>,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        match errors.check("text", required(self.text.as_deref()).map(str::to_string)) {
            Some(text) => Ok(text),
            None => Err(errors),
        }
    }
}

/// Group fields accepted by the operator CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GroupForm {
    pub fn validate(&self) -> Result<GroupInput, FormErrors> {
        let fields = GroupFields {
            title: cleaned(self.title.as_deref()),
            slug: cleaned(self.slug.as_deref()),
            description: cleaned(self.description.as_deref()),
        };
        fields.check()?;

        match fields {
            GroupFields {
                title: Some(title),
                slug: Some(slug),
                description: Some(description),
            } => Ok(GroupInput {
                title,
                slug,
                description,
            }),
            _ => Err(FormErrors::new()),
        }
    }
}

/// Username accepted by the operator CLI.
pub fn validate_username(username: &str) -> Result<String, FormErrors> {
    let field = UsernameField {
        username: cleaned(Some(username)),
    };
    field.check()?;
    field.username.ok_or_else(FormErrors::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Group> {
        vec![Group {
            id: 3,
            title: "Test group".into(),
            slug: "test-slug".into(),
            description: "Test description".into(),
        }]
    }

    fn post_form(text: Option<&str>, group: Option<&str>) -> PostForm {
        PostForm {
            text: text.map(str::to_string),
            group: group.map(str::to_string),
        }
    }

    #[test]
    fn test_post_form_accepts_text_and_group() {
        let input = post_form(Some("  Hello  "), Some("3"))
            .validate(&groups())
            .unwrap();
        assert_eq!(input.text, "Hello");
        assert_eq!(input.group_id, Some(3));
    }

    #[test]
    fn test_post_form_group_is_optional() {
        let input = post_form(Some("Hello"), Some("")).validate(&groups()).unwrap();
        assert_eq!(input.group_id, None);
        let input = post_form(Some("Hello"), None).validate(&groups()).unwrap();
        assert_eq!(input.group_id, None);
    }

    #[test]
    fn test_post_form_requires_text() {
        for text in [None, Some(""), Some("   ")] {
            let errors = post_form(text, None).validate(&groups()).unwrap_err();
            assert_eq!(errors.get("text"), Some(&[REQUIRED.to_string()][..]));
        }
    }

    #[test]
    fn test_post_form_rejects_unknown_group() {
        for group in ["42", "abc"] {
            let errors = post_form(Some("Hello"), Some(group))
                .validate(&groups())
                .unwrap_err();
            assert_eq!(errors.get("group"), Some(&[INVALID_CHOICE.to_string()][..]));
            assert!(errors.get("text").is_none());
        }
    }

    #[test]
    fn test_post_form_reports_every_failing_field() {
        let errors = post_form(None, Some("42")).validate(&groups()).unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["group", "text"]);
    }

    #[test]
    fn test_unknown_fields_are_ignored_when_binding() {
        let form: PostForm =
            serde_json::from_str(r#"{"text": "hi", "group": "", "author": "7"}"#).unwrap();
        assert_eq!(form.text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_comment_form() {
        let ok = CommentForm {
            text: Some(" nice ".into()),
        };
        assert_eq!(ok.validate().unwrap(), "nice");
        assert!(CommentForm::default().validate().is_err());
    }

    #[test]
    fn test_group_form_constraints() {
        let long_title = "x".repeat(GROUP_TITLE_MAX_CHARS + 1);
        let form = GroupForm {
            title: Some(long_title),
            slug: Some("bad slug!".into()),
            description: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("title").unwrap()[0],
            "Ensure this value has at most 200 characters (it has 201)."
        );
        assert_eq!(errors.get("slug").unwrap()[0], INVALID_SLUG);
        assert_eq!(errors.get("description").unwrap()[0], REQUIRED);
    }

    #[test]
    fn test_group_form_only_reports_first_failure_per_field() {
        let form = GroupForm {
            title: Some("ok".into()),
            slug: Some(format!("{}!", "a".repeat(GROUP_SLUG_MAX_CHARS))),
            description: Some("d".into()),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("slug").unwrap().len(), 1);
        assert!(errors.get("slug").unwrap()[0].starts_with("Ensure this value"));
    }

    #[test]
    fn test_group_form_trims_and_accepts_valid_input() {
        let form = GroupForm {
            title: Some("  Cats ".into()),
            slug: Some("cats_and-dogs".into()),
            description: Some(" All about cats ".into()),
        };
        let input = form.validate().unwrap();
        assert_eq!(input.title, "Cats");
        assert_eq!(input.slug, "cats_and-dogs");
        assert_eq!(input.description, "All about cats");
    }

    #[test]
    fn test_group_form_blank_fields_are_required() {
        let form = GroupForm {
            title: Some("   ".into()),
            slug: None,
            description: Some(String::new()),
        };
        let errors = form.validate().unwrap_err();
        for field in ["title", "slug", "description"] {
            assert_eq!(errors.get(field), Some(&[REQUIRED.to_string()][..]), "{}", field);
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let form = GroupForm {
            title: Some("é".repeat(GROUP_TITLE_MAX_CHARS)),
            slug: Some("s".repeat(GROUP_SLUG_MAX_CHARS)),
            description: Some("d".into()),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_username_validation() {
        assert_eq!(validate_username("Test.User+1").unwrap(), "Test.User+1");
        assert_eq!(validate_username("  padded ").unwrap(), "padded");

        let errors = validate_username("bad name").unwrap_err();
        assert_eq!(errors.get("username").unwrap()[0], INVALID_USERNAME);

        let errors = validate_username("").unwrap_err();
        assert_eq!(errors.get("username").unwrap()[0], REQUIRED);

        let too_long = format!("{} !", "u".repeat(USERNAME_MAX_CHARS));
        let errors = validate_username(&too_long).unwrap_err();
        assert_eq!(
            errors.get("username"),
            Some(&["Ensure this value has at most 150 characters (it has 152).".to_string()][..])
        );
    }

    #[test]
    fn test_errors_display() {
        let mut errors = FormErrors::new();
        errors.add("text", REQUIRED);
        assert_eq!(errors.to_string(), "text: This field is required.");
    }
}
