use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::types::{Recipe, Reply, RequestFormat, RequestPayload};

/// Shown when the backend reports failure without saying why
pub const FAILURE_APOLOGY: &str = "Sorry, I couldn't process your request.";
/// Shown when the exchange itself failed
pub const TRANSPORT_APOLOGY: &str =
    "Sorry, there was an error processing your request. Please try again.";

const RECIPES_INTRO: &str = "Here are some recipe suggestions:";
const SUBSTITUTES_INTRO: &str = "Here are some substitutes for your ingredient:";

/// How recipe and substitute lists are laid out in the bot text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStyle {
    /// `1. Name` / `Ingredients:` / `- item`
    #[default]
    Numbered,
    /// `**Name**` / `• item`
    Bulleted,
}

/// Translates between conversation turns and the backend's wire shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolAdapter {
    format: RequestFormat,
    style: ReplyStyle,
}

impl ProtocolAdapter {
    pub fn new(format: RequestFormat, style: ReplyStyle) -> Self {
        Self { format, style }
    }

    pub fn format(&self) -> RequestFormat {
        self.format
    }

    pub fn style(&self) -> ReplyStyle {
        self.style
    }

    pub fn build_request(
        &self,
        user_text: &str,
        session_id: &str,
        message_id: &str,
    ) -> RequestPayload {
        RequestPayload {
            user_text: user_text.to_string(),
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
            format: self.format,
        }
    }

    /// Normalize any JSON reply into display text. Never fails.
    pub fn interpret_response(&self, json: &Value) -> String {
        let reply = Reply::from_value(json);
        debug!(reply = reply_kind(&reply), "Interpreting backend reply");
        self.render(&reply)
    }

    pub fn render(&self, reply: &Reply) -> String {
        match reply {
            Reply::Failure { message } => message
                .clone()
                .unwrap_or_else(|| FAILURE_APOLOGY.to_string()),
            Reply::RecipeSuggestions(recipes) => self.render_recipes(recipes),
            Reply::IngredientSubstitutes(substitutes) => self.render_substitutes(substitutes),
            Reply::Unrecognized { message, raw } => message.clone().unwrap_or_else(|| {
                serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
            }),
        }
    }

    fn render_recipes(&self, recipes: &[Recipe]) -> String {
        let blocks: Vec<String> = recipes
            .iter()
            .enumerate()
            .map(|(index, recipe)| match self.style {
                ReplyStyle::Numbered => {
                    let mut lines = vec![
                        format!("{}. {}", index + 1, recipe.name),
                        "Ingredients:".to_string(),
                    ];
                    lines.extend(recipe.ingredients.iter().map(|i| format!("- {}", i)));
                    lines.join("\n")
                }
                ReplyStyle::Bulleted => {
                    let mut lines = vec![format!("**{}**", recipe.name)];
                    lines.extend(recipe.ingredients.iter().map(|i| format!("• {}", i)));
                    lines.join("\n")
                }
            })
            .collect();

        format!("{}\n\n{}", RECIPES_INTRO, blocks.join("\n\n"))
    }

    fn render_substitutes(&self, substitutes: &[String]) -> String {
        let lines: Vec<String> = substitutes
            .iter()
            .enumerate()
            .map(|(index, substitute)| match self.style {
                ReplyStyle::Numbered => format!("{}. {}", index + 1, substitute),
                ReplyStyle::Bulleted => format!("• {}", substitute),
            })
            .collect();

        format!("{}\n\n{}", SUBSTITUTES_INTRO, lines.join("\n"))
    }
}

fn reply_kind(reply: &Reply) -> &'static str {
    match reply {
        Reply::Failure { .. } => "failure",
        Reply::RecipeSuggestions(_) => "recipe_suggestions",
        Reply::IngredientSubstitutes(_) => "ingredient_substitutes",
        Reply::Unrecognized { .. } => "unrecognized",
    }
}
