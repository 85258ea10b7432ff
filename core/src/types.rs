use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(id: String, text: String) -> Self {
        Self {
            id,
            role: Role::User,
            text,
        }
    }

    pub fn bot(id: String, text: String) -> Self {
        Self {
            id,
            role: Role::Bot,
            text,
        }
    }
}

/// A recipe as returned in a `recipe_suggestions` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
}

impl Recipe {
    fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .map(value_to_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unnamed recipe".to_string());

        let ingredients = match value.get("ingredients") {
            Some(Value::String(list)) => split_ingredients(list),
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            _ => Vec::new(),
        };

        Self { name, ingredients }
    }
}

/// Split a comma-delimited ingredient string, trimming each entry.
///
/// Empty entries (`"a,,b"`, trailing commas) are dropped; order is preserved.
pub fn split_ingredients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ingredient| !ingredient.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decoded reply from the suggestion backend.
///
/// Every JSON value decodes to some variant; fields are read one at a time
/// and anything unexpected lands in `Unrecognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The backend ran but reported `success` as absent or falsy
    Failure { message: Option<String> },
    RecipeSuggestions(Vec<Recipe>),
    IngredientSubstitutes(Vec<String>),
    /// A successful reply of a shape this client does not know
    Unrecognized { message: Option<String>, raw: Value },
}

pub const RECIPE_SUGGESTIONS: &str = "recipe_suggestions";
pub const INGREDIENT_SUBSTITUTES: &str = "ingredient_substitutes";

impl Reply {
    pub fn from_value(value: &Value) -> Self {
        let message = fallback_message(value);

        if !value.get("success").is_some_and(is_truthy) {
            return Reply::Failure { message };
        }

        match value.get("type").and_then(Value::as_str) {
            Some(RECIPE_SUGGESTIONS) => {
                if let Some(Value::Array(recipes)) = value.get("recipes") {
                    return Reply::RecipeSuggestions(
                        recipes.iter().map(Recipe::from_value).collect(),
                    );
                }
            }
            Some(INGREDIENT_SUBSTITUTES) => {
                if let Some(Value::Array(substitutes)) = value.get("substitutes") {
                    return Reply::IngredientSubstitutes(
                        substitutes.iter().map(value_to_text).collect(),
                    );
                }
            }
            _ => {}
        }

        Reply::Unrecognized {
            message,
            raw: value.clone(),
        }
    }
}

/// First non-empty of `output` and `message`
fn fallback_message(value: &Value) -> Option<String> {
    ["output", "message"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Loose truthiness for the `success` flag, which some producers send as `1` or `"true"`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Request-field mapping used when talking to the suggestion backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    /// `{ chatInput, sessionId, messageId }`
    #[default]
    Chat,
    /// `{ message }`
    Simple,
}

/// Outgoing conversation request.
///
/// The identifiers are always carried so they can be logged and correlated
/// locally, even when the wire format does not include them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    pub user_text: String,
    pub session_id: String,
    pub message_id: String,
    pub format: RequestFormat,
}

impl Serialize for RequestPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.format {
            RequestFormat::Chat => {
                let mut state = serializer.serialize_struct("RequestPayload", 3)?;
                state.serialize_field("chatInput", &self.user_text)?;
                state.serialize_field("sessionId", &self.session_id)?;
                state.serialize_field("messageId", &self.message_id)?;
                state.end()
            }
            RequestFormat::Simple => {
                let mut state = serializer.serialize_struct("RequestPayload", 1)?;
                state.serialize_field("message", &self.user_text)?;
                state.end()
            }
        }
    }
}

/// Thumbs up or thumbs down on a bot reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    pub fn is_helpful(self) -> bool {
        matches!(self, Rating::Positive)
    }
}

/// Body sent to the feedback collection endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub message_id: String,
    pub session_id: String,
    pub is_helpful: bool,
    pub comment: String,
}

/// Body sent to the optional message archive endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    pub message_id: String,
    pub session_id: String,
    pub sender_type: Role,
    pub message_text: String,
}

impl ArchivedMessage {
    pub fn new(session_id: &str, message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            session_id: session_id.to_string(),
            sender_type: message.role,
            message_text: message.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_ingredients() {
        assert_eq!(
            split_ingredients("eggs, flour ,milk"),
            vec!["eggs", "flour", "milk"]
        );
        assert_eq!(split_ingredients("salt,, pepper,"), vec!["salt", "pepper"]);
        assert!(split_ingredients("").is_empty());
    }

    #[test]
    fn test_empty_object_is_failure() {
        assert_eq!(
            Reply::from_value(&json!({})),
            Reply::Failure { message: None }
        );
    }

    #[test]
    fn test_failure_prefers_output_then_message() {
        assert_eq!(
            Reply::from_value(&json!({"success": false, "output": "no match", "message": "x"})),
            Reply::Failure {
                message: Some("no match".to_string())
            }
        );
        assert_eq!(
            Reply::from_value(&json!({"success": false, "output": "", "message": "try again"})),
            Reply::Failure {
                message: Some("try again".to_string())
            }
        );
    }

    #[test]
    fn test_recipes_with_mixed_ingredient_shapes() {
        let reply = Reply::from_value(&json!({
            "success": true,
            "type": "recipe_suggestions",
            "recipes": [
                {"name": "Pancakes", "ingredients": "eggs, flour ,milk"},
                {"name": "Omelette", "ingredients": ["eggs", "cheese"]},
                {"ingredients": 42}
            ]
        }));

        assert_eq!(
            reply,
            Reply::RecipeSuggestions(vec![
                Recipe {
                    name: "Pancakes".to_string(),
                    ingredients: vec!["eggs".into(), "flour".into(), "milk".into()],
                },
                Recipe {
                    name: "Omelette".to_string(),
                    ingredients: vec!["eggs".into(), "cheese".into()],
                },
                Recipe {
                    name: "Unnamed recipe".to_string(),
                    ingredients: vec![],
                },
            ])
        );
    }

    #[test]
    fn test_known_type_without_list_is_unrecognized() {
        let value = json!({"success": true, "type": "recipe_suggestions", "recipes": "none"});
        assert!(matches!(
            Reply::from_value(&value),
            Reply::Unrecognized { message: None, .. }
        ));
    }

    #[test]
    fn test_truthy_success_flag() {
        let value = json!({"success": 1, "type": "ingredient_substitutes", "substitutes": ["a"]});
        assert_eq!(
            Reply::from_value(&value),
            Reply::IngredientSubstitutes(vec!["a".to_string()])
        );
        assert!(matches!(
            Reply::from_value(&json!({"success": 0})),
            Reply::Failure { .. }
        ));
    }

    #[test]
    fn test_non_object_replies_do_not_panic() {
        for value in [json!(null), json!("text"), json!([1, 2]), json!(3.5)] {
            assert!(matches!(Reply::from_value(&value), Reply::Failure { .. }));
        }
    }

    #[test]
    fn test_request_payload_wire_formats() {
        let mut payload = RequestPayload {
            user_text: "eggs".to_string(),
            session_id: "s1".to_string(),
            message_id: "m1".to_string(),
            format: RequestFormat::Chat,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"chatInput": "eggs", "sessionId": "s1", "messageId": "m1"})
        );

        payload.format = RequestFormat::Simple;
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"message": "eggs"})
        );
    }

    #[test]
    fn test_archived_message_wire_format() {
        let message = Message::bot("b1".to_string(), "hello".to_string());
        assert_eq!(
            serde_json::to_value(ArchivedMessage::new("s1", &message)).unwrap(),
            json!({
                "message_id": "b1",
                "session_id": "s1",
                "sender_type": "bot",
                "message_text": "hello"
            })
        );
    }
}
