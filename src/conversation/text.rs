//! Reply post-processing

use crate::persona::Persona;

/// Removes markdown emphasis markers (`*`, `**`) and trims the result
///
/// # Examples
///
/// ```
/// use voxchat::conversation::strip_emphasis;
///
/// assert_eq!(strip_emphasis("**Hello** *there*"), "Hello there");
/// ```
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}

/// Whether `text` mentions the persona's display name (case-insensitive)
pub fn mentions_name(text: &str, persona: &Persona) -> bool {
    text.to_lowercase().contains(&persona.name.to_lowercase())
}

/// Prefixes a self-introduction unless the reply already names the persona
pub fn ensure_introduction(text: String, persona: &Persona) -> String {
    if mentions_name(&text, persona) {
        text
    } else {
        format!("Hello, I'm {}, your {}. {}", persona.name, persona.title, text)
    }
}
