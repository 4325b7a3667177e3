//! Environment configuration for model invocation.
//!
//! Everything here is opaque to the streaming core: it is assembled once and
//! handed to the chunk source inside each request.

use std::env;

use crate::presets::Personality;

pub const MODEL_ENV_VAR: &str = "SANDBOX_CHAT_MODEL";
pub const TEMPERATURE_ENV_VAR: &str = "SANDBOX_CHAT_TEMPERATURE";
pub const SYSTEM_PROMPT_ENV_VAR: &str = "SANDBOX_CHAT_SYSTEM_PROMPT";
pub const PERSONALITY_ENV_VAR: &str = "SANDBOX_CHAT_PERSONALITY";

pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant inside a live coding \
sandbox. When asked for code, prefer fenced blocks tagged html, css, or js so the preview pane \
can render them.";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
    pub personality: Personality,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            personality: Personality::Helpful,
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Self {
        Self {
            model: env_string_opt(MODEL_ENV_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: env_temperature(),
            system_prompt: env_string_opt(SYSTEM_PROMPT_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            personality: env_string_opt(PERSONALITY_ENV_VAR)
                .and_then(|name| Personality::from_name(&name))
                .unwrap_or(Personality::Helpful),
        }
    }

    /// Base system prompt plus the personality's style block.
    #[must_use]
    pub fn effective_system_prompt(&self) -> String {
        format!("{}\n\n{}", self.system_prompt, self.personality.prompt_block())
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_temperature() -> f32 {
    env_string_opt(TEMPERATURE_ENV_VAR)
        .and_then(|value| value.parse::<f32>().ok())
        .filter(|temperature| (0.0..=2.0).contains(temperature))
        .unwrap_or(DEFAULT_TEMPERATURE)
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use super::*;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn unset_or_blank_environment_falls_back_to_defaults() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _model = EnvGuard::set(MODEL_ENV_VAR, None);
        let _temperature = EnvGuard::set(TEMPERATURE_ENV_VAR, Some("   "));
        let _prompt = EnvGuard::set(SYSTEM_PROMPT_ENV_VAR, None);
        let _personality = EnvGuard::set(PERSONALITY_ENV_VAR, None);

        let config = ModelConfig::from_env();

        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn environment_overrides_are_trimmed_and_parsed() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _model = EnvGuard::set(MODEL_ENV_VAR, Some("  models/custom  "));
        let _temperature = EnvGuard::set(TEMPERATURE_ENV_VAR, Some("1.2"));
        let _prompt = EnvGuard::set(SYSTEM_PROMPT_ENV_VAR, Some("Answer in haiku."));
        let _personality = EnvGuard::set(PERSONALITY_ENV_VAR, Some("Concise"));

        let config = ModelConfig::from_env();

        assert_eq!(config.model, "models/custom");
        assert_eq!(config.temperature, 1.2);
        assert_eq!(config.system_prompt, "Answer in haiku.");
        assert_eq!(config.personality, Personality::Concise);
    }

    #[test]
    fn out_of_range_or_garbage_temperature_falls_back() {
        let _env_serialization = lock_unpoisoned(env_lock());

        {
            let _temperature = EnvGuard::set(TEMPERATURE_ENV_VAR, Some("11"));
            assert_eq!(ModelConfig::from_env().temperature, DEFAULT_TEMPERATURE);
        }

        {
            let _temperature = EnvGuard::set(TEMPERATURE_ENV_VAR, Some("warm"));
            assert_eq!(ModelConfig::from_env().temperature, DEFAULT_TEMPERATURE);
        }
    }

    #[test]
    fn effective_system_prompt_appends_the_personality_block() {
        let config = ModelConfig::default();
        let prompt = config.effective_system_prompt();

        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.ends_with(Personality::Helpful.prompt_block()));
    }
}
