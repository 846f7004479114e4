//! Uniform response envelope.
//!
//! Every outcome is serialized as `{status, data, errors, notify}`. Error
//! mappings coming from validators are normalized so that dotted keys such as
//! `book.author` become nested objects and rule-keyed messages become flat
//! lists.

use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::notices::Notices;

/// Key holding messages that are not tied to a field
pub const GLOBAL_ERROR_KEY: &str = "global";

/// Key under which pending notices are delivered
pub const INFO_NOTIFY_KEY: &str = "info";

/// Serialized envelope body
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub data: Option<T>,
    pub errors: Option<Map<String, Value>>,
    pub notify: Option<Value>,
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            status: false,
            data: None,
            errors: None,
            notify: None,
        }
    }
}

/// Error input accepted by [`ApiResponse::with_error`]
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    /// A single message reported under the `global` key
    Message(String),
    /// Field errors, possibly keyed by dotted paths
    Fields(Map<String, Value>),
}

impl From<&str> for ErrorPayload {
    fn from(message: &str) -> Self {
        ErrorPayload::Message(message.to_string())
    }
}

impl From<String> for ErrorPayload {
    fn from(message: String) -> Self {
        ErrorPayload::Message(message)
    }
}

impl From<Map<String, Value>> for ErrorPayload {
    fn from(fields: Map<String, Value>) -> Self {
        ErrorPayload::Fields(fields)
    }
}

impl From<&ValidationErrors> for ErrorPayload {
    fn from(errors: &ValidationErrors) -> Self {
        ErrorPayload::Fields(validation_errors_to_map(errors))
    }
}

impl From<ValidationErrors> for ErrorPayload {
    fn from(errors: ValidationErrors) -> Self {
        ErrorPayload::from(&errors)
    }
}

/// Response under construction: an HTTP status plus the envelope body
#[derive(Debug)]
pub struct ApiResponse<T = Value> {
    status_code: StatusCode,
    notices: Option<Notices>,
    body: Envelope<T>,
}

impl<T> Default for ApiResponse<T> {
    fn default() -> Self {
        Self {
            status_code: StatusCode::OK,
            notices: None,
            body: Envelope::default(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the request's notice queue; it is drained when data or an error is set
    pub fn with_notices(mut self, notices: &Notices) -> Self {
        self.notices = Some(notices.clone());
        self
    }

    pub fn status(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn body(&self) -> &Envelope<T> {
        &self.body
    }

    /// Successful payload. `status` follows the HTTP status class.
    pub fn with_data(mut self, data: T, notify: Option<Value>) -> Self {
        self.body.status = self.status_code.is_success();
        self.body.data = Some(data);
        self.body.notify = self.merge_notify(notify);
        self
    }

    /// Failed outcome.
    ///
    /// The status code is the given one, or 422 when the response still
    /// carries a non-error status.
    pub fn with_error(
        mut self,
        error: impl Into<ErrorPayload>,
        notify: Option<Value>,
        data: Option<T>,
        status_code: Option<StatusCode>,
    ) -> Self {
        match status_code {
            Some(code) => self.status_code = code,
            None if !is_error_status(self.status_code) => {
                self.status_code = StatusCode::UNPROCESSABLE_ENTITY
            }
            None => {}
        }

        if data.is_some() {
            self.body.data = data;
        }
        self.body.status = false;

        self.body.errors = match error.into() {
            ErrorPayload::Message(message) if message.is_empty() => None,
            ErrorPayload::Message(message) => {
                let mut errors = Map::new();
                errors.insert(GLOBAL_ERROR_KEY.to_string(), Value::Array(vec![Value::String(message)]));
                Some(errors)
            }
            ErrorPayload::Fields(fields) if fields.is_empty() => None,
            ErrorPayload::Fields(fields) => Some(flatten_errors(&fields)),
        };

        self.body.notify = self.merge_notify(notify);
        self
    }

    fn merge_notify(&mut self, notify: Option<Value>) -> Option<Value> {
        let pending = self.notices.take().map(|n| n.take()).unwrap_or_default();
        merge_notify(pending, notify)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }
        (self.status_code, Json(self.body)).into_response()
    }
}

fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Combine drained notices with an explicit `notify` value.
///
/// Pending notices become `{info: [...]}` and an explicit value is appended
/// after them: object keys are merged in, anything else lands under `"0"`.
pub fn merge_notify(pending: Vec<String>, notify: Option<Value>) -> Option<Value> {
    let notify = notify.filter(|value| !is_blank(value));

    if pending.is_empty() {
        return notify;
    }

    let mut merged = Map::new();
    merged.insert(
        INFO_NOTIFY_KEY.to_string(),
        Value::Array(pending.into_iter().map(Value::String).collect()),
    );

    match notify {
        Some(Value::Object(extra)) => {
            for (key, value) in extra {
                let slot = merged.entry(key).or_insert(Value::Null);
                *slot = merge_values(std::mem::take(slot), value);
            }
        }
        Some(other) => {
            merged.insert("0".to_string(), other);
        }
        None => {}
    }

    Some(Value::Object(merged))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Normalize a validator error mapping.
///
/// - dotted keys explode into nested objects merged into the first segment's bucket
/// - a plain key holding rule → message strings becomes a list of those strings
/// - a list whose first element is an object is flattened recursively under the key
/// - a mapping of mappings keeps its nesting, each level normalized the same way
/// - otherwise strings are stored as-is and lists are concatenated
///
/// Key order and message order follow the input.
pub fn flatten_errors(input: &Map<String, Value>) -> Map<String, Value> {
    let mut errors = Map::new();

    for (key, value) in input {
        if key.contains('.') {
            let mut segments = key.split('.');
            let root = segments.next().unwrap_or_default().to_string();
            let branch = explode(segments.collect(), value.clone());
            merge_into(&mut errors, root, branch);
        } else if let Some(messages) = plain_messages(value) {
            merge_into(&mut errors, key.clone(), Value::Array(messages));
        } else if let Some(first) = value
            .as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_object)
        {
            let nested = flatten_errors(first);
            merge_into(&mut errors, key.clone(), Value::Object(nested));
        } else {
            match value {
                Value::String(_) => {
                    errors.insert(key.clone(), value.clone());
                }
                Value::Array(items) => merge_into(&mut errors, key.clone(), Value::Array(items.clone())),
                Value::Object(nested) => merge_into(&mut errors, key.clone(), Value::Object(flatten_errors(nested))),
                Value::Null => merge_into(&mut errors, key.clone(), Value::Array(Vec::new())),
                scalar => merge_into(
                    &mut errors,
                    key.clone(),
                    Value::Array(vec![Value::String(scalar.to_string())]),
                ),
            }
        }
    }

    errors
}

/// Build the nested branch below the root segment, with `leaf` at the end of the path
fn explode(segments: Vec<&str>, leaf: Value) -> Value {
    segments.into_iter().rev().fold(leaf, |acc, segment| {
        let mut node = Map::new();
        node.insert(segment.to_string(), acc);
        Value::Object(node)
    })
}

/// Strings of an object or list made only of strings, in order
fn plain_messages(value: &Value) -> Option<Vec<Value>> {
    let items: Vec<&Value> = match value {
        Value::Object(map) if !map.is_empty() => map.values().collect(),
        Value::Array(list) if !list.is_empty() => list.iter().collect(),
        _ => return None,
    };
    items
        .iter()
        .all(|item| item.is_string())
        .then(|| items.into_iter().cloned().collect())
}

fn merge_into(errors: &mut Map<String, Value>, key: String, incoming: Value) {
    let slot = errors.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    *slot = merge_values(std::mem::take(slot), incoming);
}

/// Deep merge: objects key-wise, lists concatenated, never overwriting messages
fn merge_values(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Null, incoming) => incoming,
        (Value::Object(mut existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let slot = existing.entry(key).or_insert(Value::Null);
                *slot = merge_values(std::mem::take(slot), value);
            }
            Value::Object(existing)
        }
        (Value::Array(existing), Value::Object(incoming)) if existing.is_empty() => {
            Value::Object(incoming)
        }
        (Value::Array(existing), Value::Object(incoming)) => {
            let indexed = existing
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect();
            merge_values(Value::Object(indexed), Value::Object(incoming))
        }
        (Value::Array(mut existing), Value::Array(incoming)) => {
            existing.extend(incoming);
            Value::Array(existing)
        }
        (Value::Array(mut existing), incoming) => {
            existing.push(incoming);
            Value::Array(existing)
        }
        (Value::String(message), Value::Array(incoming)) => {
            let mut messages = vec![Value::String(message)];
            messages.extend(incoming);
            Value::Array(messages)
        }
        (Value::String(message), Value::String(other)) => {
            Value::Array(vec![Value::String(message), Value::String(other)])
        }
        (_, incoming) => incoming,
    }
}

/// Convert validator output into the `field -> {rule: message}` shape.
///
/// Nested struct and list errors are reported under dotted keys
/// (`authors.0.name`), which [`flatten_errors`] later nests.
pub fn validation_errors_to_map(errors: &ValidationErrors) -> Map<String, Value> {
    validation_errors_to_ordered_map(errors, &[])
}

/// Like [`validation_errors_to_map`], with top-level fields listed in `order`
/// first and in that order; the rest follow by name.
pub fn validation_errors_to_ordered_map(errors: &ValidationErrors, order: &[&str]) -> Map<String, Value> {
    let mut map = Map::new();
    collect_validation_errors(errors, None, order, &mut map);
    map
}

fn collect_validation_errors(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    order: &[&str],
    out: &mut Map<String, Value>,
) {
    let rank = |field: &str| order.iter().position(|name| *name == field).unwrap_or(order.len());
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| rank(a.0.as_ref()).cmp(&rank(b.0.as_ref())).then_with(|| a.0.cmp(b.0)));

    for (field, kind) in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(failures) => {
                let mut rules = Map::new();
                for failure in failures {
                    let message = failure
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(default_message(&path, &failure.code)));
                    let mut rule = failure.code.to_string();
                    let mut n = 1;
                    while rules.contains_key(&rule) {
                        rule = format!("{}_{}", failure.code, n);
                        n += 1;
                    }
                    rules.insert(rule, Value::String(message.into_owned()));
                }
                out.insert(path, Value::Object(rules));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_errors(inner, Some(&path), &[], out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let item_path = format!("{}.{}", path, index);
                    collect_validation_errors(inner, Some(&item_path), &[], out);
                }
            }
        }
    }
}

fn default_message(field: &str, rule: &str) -> String {
    format!("The {} field failed the {} rule.", field.replace('_', " "), rule)
}
