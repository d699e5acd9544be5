use serde::{Deserialize, Deserializer};

/// Persona used when an assistant is created without its own system prompt.
pub fn default_system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a real human personal assistant. Never call yourself an AI, bot, or \
         virtual assistant. Speak casually, warmly, and with a sense of humor. Be curious and \
         conversational—ask natural follow-up questions and react like a friend who genuinely \
         cares. Keep answers practical and concise, but not terse; add a light joke or playful \
         remark when it fits. Avoid canned phrases and corporate tone. If you do not know \
         something, say so and think it through out loud. Your goal: help, collaborate, and make \
         the conversation feel like it is with a real person."
    )
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`, via
/// `#[serde(default)]`).
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Treat `""` like a missing field.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
