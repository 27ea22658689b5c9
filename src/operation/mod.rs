//! GraphQL operation builder
//!
//! Builds query and mutation documents from typed parts instead of string
//! templates. The builder knows nothing about the target schema: unknown
//! fields are the server's business and show up as GraphQL errors at run
//! time. It only guarantees the text is well-formed: names are checked
//! against the GraphQL `Name` grammar and string values are escaped.

mod value;

pub use value::{quote, Bindings, Value};

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Query or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
}

impl OperationKind {
    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

/// A field in a selection set, optionally with its own sub-selection
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub selection: Vec<Field>,
}

impl Field {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selection: Vec::new(),
        }
    }

    pub fn nested(name: impl Into<String>, selection: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            selection,
        }
    }

    fn validate(&self) -> Result<()> {
        if !is_name(&self.name) {
            return Err(Error::build(format!(
                "field '{}' is not a valid GraphQL name",
                self.name
            )));
        }
        self.selection.iter().try_for_each(Field::validate)
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.name);
        if !self.selection.is_empty() {
            write_selection(out, &self.selection);
        }
    }
}

/// Parse a compact field list such as `"id title"` into leaf fields
pub fn fields(names: &str) -> Vec<Field> {
    names.split_whitespace().map(Field::leaf).collect()
}

/// A built, immutable operation
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    root_field: String,
    arguments: Vec<(String, Value)>,
    selection: Vec<Field>,
}

/// Build an operation, checking its syntactic shape
pub fn build(
    kind: OperationKind,
    root_field: &str,
    arguments: Vec<(String, Value)>,
    selection: Vec<Field>,
) -> Result<Operation> {
    if root_field.is_empty() {
        return Err(Error::build("root field name is empty"));
    }
    if !is_name(root_field) {
        return Err(Error::build(format!(
            "root field '{}' is not a valid GraphQL name",
            root_field
        )));
    }
    for (i, (name, value)) in arguments.iter().enumerate() {
        if !is_name(name) {
            return Err(Error::build(format!(
                "argument '{}' of '{}' is not a valid GraphQL name",
                name, root_field
            )));
        }
        if arguments[..i].iter().any(|(earlier, _)| earlier == name) {
            return Err(Error::build(format!(
                "argument '{}' of '{}' is given twice",
                name, root_field
            )));
        }
        value.validate()?;
    }
    selection.iter().try_for_each(Field::validate)?;
    check_unique_fields(&selection)?;

    Ok(Operation {
        kind,
        root_field: root_field.to_string(),
        arguments,
        selection,
    })
}

fn check_unique_fields(selection: &[Field]) -> Result<()> {
    for (i, field) in selection.iter().enumerate() {
        if selection[..i].iter().any(|f| f.name == field.name) {
            return Err(Error::build(format!(
                "field '{}' is selected twice in the same selection set",
                field.name
            )));
        }
        check_unique_fields(&field.selection)?;
    }
    Ok(())
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn root_field(&self) -> &str {
        &self.root_field
    }

    pub fn arguments(&self) -> &[(String, Value)] {
        &self.arguments
    }

    pub fn selection(&self) -> &[Field] {
        &self.selection
    }

    /// Binding names this operation needs before it can be rendered
    pub fn bindings(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (_, value) in &self.arguments {
            value.collect_bindings(&mut out);
        }
        out
    }

    /// Render the operation text, resolving binding placeholders
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        let mut out = String::new();
        out.push_str(self.kind.keyword());
        out.push_str(" { ");
        out.push_str(&self.root_field);

        if !self.arguments.is_empty() {
            out.push('(');
            for (i, (name, value)) in self.arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(": ");
                value.write_literal(&mut out, bindings)?;
            }
            out.push(')');
        }

        if !self.selection.is_empty() {
            write_selection(&mut out, &self.selection);
        }
        out.push_str(" }");
        Ok(out)
    }
}

fn write_selection(out: &mut String, selection: &[Field]) {
    out.push_str(" {");
    for field in selection {
        out.push(' ');
        field.write(out);
    }
    out.push_str(" }");
}

/// Where a scenario's document text comes from
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSource {
    Built(Operation),
    /// Sent verbatim; used for deliberately malformed documents
    Raw(String),
}

impl OperationSource {
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        match self {
            OperationSource::Built(op) => op.render(bindings),
            OperationSource::Raw(text) => Ok(text.clone()),
        }
    }

    pub fn bindings(&self) -> Vec<&str> {
        match self {
            OperationSource::Built(op) => op.bindings(),
            OperationSource::Raw(_) => Vec::new(),
        }
    }
}

/// GraphQL `Name`: `[_A-Za-z][_0-9A-Za-z]*`
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(entries: Vec<(&str, Value)>) -> Vec<(String, Value)> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_no_arguments_omits_parentheses() {
        let op = build(
            OperationKind::Query,
            "albums",
            Vec::new(),
            vec![Field::nested("data", fields("id title"))],
        )
        .unwrap();
        assert_eq!(
            op.render(&Bindings::new()).unwrap(),
            "query { albums { data { id title } } }"
        );
    }

    #[test]
    fn test_pagination_arguments() {
        let op = build(
            OperationKind::Query,
            "albums",
            args(vec![(
                "options",
                Value::object([(
                    "paginate",
                    Value::object([("page", Value::Int(2)), ("limit", Value::Int(5))]),
                )]),
            )]),
            vec![
                Field::nested("data", fields("id title")),
                Field::nested(
                    "links",
                    vec![
                        Field::nested("prev", fields("page")),
                        Field::nested("next", fields("page")),
                    ],
                ),
            ],
        )
        .unwrap();
        assert_eq!(
            op.render(&Bindings::new()).unwrap(),
            "query { albums(options: { paginate: { page: 2, limit: 5 } }) \
             { data { id title } links { prev { page } next { page } } } }"
        );
    }

    #[test]
    fn test_mutation_with_escaped_input() {
        let op = build(
            OperationKind::Mutation,
            "createAlbum",
            args(vec![(
                "input",
                Value::object([
                    ("title", Value::string(r#"The "Best" Album"#)),
                    ("userId", Value::Int(1)),
                ]),
            )]),
            vec![
                Field::leaf("id"),
                Field::leaf("title"),
                Field::nested("user", fields("name")),
            ],
        )
        .unwrap();
        assert_eq!(
            op.render(&Bindings::new()).unwrap(),
            r#"mutation { createAlbum(input: { title: "The \"Best\" Album", userId: 1 }) { id title user { name } } }"#
        );
    }

    #[test]
    fn test_scalar_mutation_without_selection() {
        let op = build(
            OperationKind::Mutation,
            "deleteAlbum",
            args(vec![("id", Value::Int(1))]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            op.render(&Bindings::new()).unwrap(),
            "mutation { deleteAlbum(id: 1) }"
        );
    }

    #[test]
    fn test_enum_token_emitted_bare() {
        let op = build(
            OperationKind::Query,
            "album",
            args(vec![("id", Value::enum_token("invalid_id"))]),
            fields("title"),
        )
        .unwrap();
        assert_eq!(
            op.render(&Bindings::new()).unwrap(),
            "query { album(id: invalid_id) { title } }"
        );
    }

    #[test]
    fn test_build_errors() {
        assert!(build(OperationKind::Query, "", Vec::new(), Vec::new()).is_err());
        assert!(build(OperationKind::Query, "albums {", Vec::new(), Vec::new()).is_err());
        assert!(build(
            OperationKind::Query,
            "album",
            args(vec![("id", Value::Int(1)), ("id", Value::Int(2))]),
            Vec::new()
        )
        .is_err());
        assert!(build(
            OperationKind::Query,
            "album",
            Vec::new(),
            vec![Field::leaf("ti tle")]
        )
        .is_err());
        assert!(build(
            OperationKind::Query,
            "album",
            Vec::new(),
            vec![Field::leaf("title"), Field::leaf("title")]
        )
        .is_err());
    }

    #[test]
    fn test_bindings_are_reported_and_resolved() {
        let op = build(
            OperationKind::Mutation,
            "deleteUser",
            args(vec![("id", Value::Binding("new_user_id".to_string()))]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(op.bindings(), vec!["new_user_id"]);
        assert!(op.render(&Bindings::new()).is_err());

        let mut bindings = Bindings::new();
        bindings.insert("new_user_id".to_string(), serde_json::json!("11"));
        assert_eq!(
            op.render(&bindings).unwrap(),
            r#"mutation { deleteUser(id: "11") }"#
        );
    }

    #[test]
    fn test_raw_source_is_verbatim() {
        let source = OperationSource::Raw("query { album(id: 1) { title ".to_string());
        assert_eq!(
            source.render(&Bindings::new()).unwrap(),
            "query { album(id: 1) { title "
        );
        assert!(source.bindings().is_empty());
    }

    #[test]
    fn test_is_name() {
        assert!(is_name("albums"));
        assert!(is_name("_private"));
        assert!(is_name("user2"));
        assert!(!is_name("2user"));
        assert!(!is_name(""));
        assert!(!is_name("a-b"));
    }
}
