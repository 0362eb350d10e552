//! Persona registry
//!
//! A persona is a named preset combining a system prompt and a voice
//! identifier, selected by role key. The registry is built once at startup
//! from the built-in defaults plus any overrides from the configuration file
//! and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static description of one persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Role key used by clients to select the persona (e.g. `doctor`)
    pub key: String,
    /// Display name the persona introduces itself with
    pub name: String,
    /// Short professional title (e.g. "medical advisor")
    pub title: String,
    /// System prompt sent ahead of every conversation
    pub system_prompt: String,
    /// Voice identifier passed to the speech synthesizer
    pub voice_id: String,
}

impl Persona {
    fn builtin(key: &str, name: &str, title: &str, focus: &str, voice_id: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            system_prompt: format!(
                "You are {name}, an experienced {title}. {focus} \
                 Speak naturally, as in a spoken conversation: keep answers short, \
                 avoid lists and markdown formatting, and ask a follow-up question \
                 when the request is unclear. Remind the user to consult a licensed \
                 professional for decisions with legal, medical or financial consequences."
            ),
            voice_id: voice_id.to_string(),
        }
    }
}

/// Read-only lookup table from role key to persona
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl PersonaRegistry {
    /// Creates the registry with the seven built-in personas
    ///
    /// # Examples
    ///
    /// ```
    /// use voxchat::persona::PersonaRegistry;
    ///
    /// let registry = PersonaRegistry::builtin();
    /// assert!(registry.lookup("doctor").is_some());
    /// assert!(registry.lookup("astronaut").is_none());
    /// ```
    pub fn builtin() -> Self {
        let personas = [
            Persona::builtin(
                "lawyer",
                "Daniel Reeves",
                "legal advisor",
                "You explain legal concepts, contracts and everyday legal questions in plain language.",
                "pNInz6obpgDQGcFmaJgB",
            ),
            Persona::builtin(
                "doctor",
                "Dr. Sarah Chen",
                "medical advisor",
                "You discuss symptoms, healthy habits and general medical information with care and clarity.",
                "21m00Tcm4TlvDq8ikWAM",
            ),
            Persona::builtin(
                "tutor",
                "Emma Walsh",
                "personal tutor",
                "You help students understand difficult topics step by step and check their understanding.",
                "EXAVITQu4vr4xnAGTZQx",
            ),
            Persona::builtin(
                "engineer",
                "Marcus Lee",
                "software engineer",
                "You help with programming, system design and debugging, giving concrete practical advice.",
                "TxGEqnHWrfWFTfGW9XjX",
            ),
            Persona::builtin(
                "financial",
                "Olivia Grant",
                "financial advisor",
                "You help with budgeting, saving, investing basics and personal financial planning.",
                "MF3mGyEYCl7XYWbV9V6O",
            ),
            Persona::builtin(
                "writer",
                "James Porter",
                "writing coach",
                "You help people draft, edit and improve their writing, from emails to fiction.",
                "ErXwobaYiN019PkySvjV",
            ),
            Persona::builtin(
                "tax",
                "Rachel Morgan",
                "tax consultant",
                "You explain tax rules, deductions, filing deadlines and record keeping.",
                "AZnzlk1XvdvUeBnXmlld",
            ),
        ];

        Self {
            personas: personas
                .into_iter()
                .map(|p| (p.key.clone(), p))
                .collect(),
        }
    }

    /// Applies configured personas on top of the registry
    ///
    /// An override with an existing key replaces that persona; a new key is
    /// added.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = Persona>) -> Self {
        for persona in overrides {
            tracing::debug!(key = %persona.key, "Applying persona override");
            self.personas.insert(persona.key.clone(), persona);
        }
        self
    }

    /// Looks up a persona by role key
    pub fn lookup(&self, key: &str) -> Option<&Persona> {
        self.personas.get(key)
    }

    /// Resolves a persona, falling back to `default_key` when the requested
    /// key is absent or unknown
    ///
    /// Returns `None` only when the default key itself is missing, which
    /// configuration validation rules out.
    pub fn resolve_or_default(&self, key: Option<&str>, default_key: &str) -> Option<&Persona> {
        match key.and_then(|k| self.lookup(k)) {
            Some(persona) => Some(persona),
            None => {
                if let Some(requested) = key {
                    tracing::debug!(
                        requested,
                        default_key,
                        "Unknown role, using default persona"
                    );
                }
                self.lookup(default_key)
            }
        }
    }

    /// Whether the registry holds `key`
    pub fn contains(&self, key: &str) -> bool {
        self.personas.contains_key(key)
    }

    /// Iterates personas ordered by role key
    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_all_role_keys() {
        let registry = PersonaRegistry::builtin();
        for key in [
            "lawyer",
            "doctor",
            "tutor",
            "engineer",
            "financial",
            "writer",
            "tax",
        ] {
            assert!(registry.contains(key), "missing persona {}", key);
        }
        assert_eq!(registry.iter().count(), 7);
    }

    #[test]
    fn test_lookup_returns_descriptor() {
        let registry = PersonaRegistry::builtin();
        let doctor = registry.lookup("doctor").unwrap();
        assert_eq!(doctor.name, "Dr. Sarah Chen");
        assert!(doctor.system_prompt.contains("Dr. Sarah Chen"));
        assert!(!doctor.voice_id.is_empty());
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        let registry = PersonaRegistry::builtin();
        assert!(registry.lookup("pilot").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_resolve_or_default_falls_back() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(
            registry.resolve_or_default(Some("pilot"), "tutor").unwrap().key,
            "tutor"
        );
        assert_eq!(
            registry.resolve_or_default(None, "tutor").unwrap().key,
            "tutor"
        );
        assert_eq!(
            registry.resolve_or_default(Some("tax"), "tutor").unwrap().key,
            "tax"
        );
        assert!(registry.resolve_or_default(None, "missing").is_none());
    }

    #[test]
    fn test_overrides_replace_and_add() {
        let custom = Persona {
            key: "doctor".to_string(),
            name: "Dr. House".to_string(),
            title: "diagnostician".to_string(),
            system_prompt: "You are Dr. House.".to_string(),
            voice_id: "voice-x".to_string(),
        };
        let chef = Persona {
            key: "chef".to_string(),
            name: "Chef Anna".to_string(),
            title: "chef".to_string(),
            system_prompt: "You cook.".to_string(),
            voice_id: "voice-y".to_string(),
        };

        let registry = PersonaRegistry::builtin().with_overrides(vec![custom, chef]);
        assert_eq!(registry.iter().count(), 8);
        assert_eq!(registry.lookup("doctor").unwrap().name, "Dr. House");
        assert_eq!(registry.lookup("chef").unwrap().voice_id, "voice-y");
    }

    #[test]
    fn test_iter_is_ordered_by_key() {
        let registry = PersonaRegistry::builtin();
        let keys: Vec<&str> = registry.iter().map(|p| p.key.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_persona_from_yaml() {
        let yaml = r#"
key: coach
name: Sam Rivera
title: fitness coach
system_prompt: You are a fitness coach.
voice_id: abc123
"#;
        let persona: Persona = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(persona.key, "coach");
        assert_eq!(persona.voice_id, "abc123");
    }
}
