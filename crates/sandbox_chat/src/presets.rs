//! Personality presets folded opaquely into the system prompt.

/// Enumerated reply-style presets selectable by the settings layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personality {
    Helpful,
    Concise,
    Playful,
}

impl Personality {
    pub const ALL: [Personality; 3] = [Self::Helpful, Self::Concise, Self::Playful];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Helpful => "helpful",
            Self::Concise => "concise",
            Self::Playful => "playful",
        }
    }

    /// Resolves a preset from its configured name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == normalized)
    }

    /// Style block appended to the base system prompt.
    #[must_use]
    pub fn prompt_block(self) -> &'static str {
        match self {
            Self::Helpful => {
                "Style: friendly and thorough. Explain what the code does and how to tweak it."
            }
            Self::Concise => {
                "Style: terse. Lead with the code block and keep prose to one or two sentences."
            }
            Self::Playful => {
                "Style: lighthearted. Favor visually fun examples the preview pane can show off."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Personality;

    #[test]
    fn every_preset_resolves_from_its_own_name() {
        for preset in Personality::ALL {
            assert_eq!(Personality::from_name(preset.name()), Some(preset));
        }
    }

    #[test]
    fn resolution_trims_and_ignores_case() {
        assert_eq!(
            Personality::from_name("  Playful \n"),
            Some(Personality::Playful)
        );
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        assert_eq!(Personality::from_name("grumpy"), None);
        assert_eq!(Personality::from_name(""), None);
    }

    #[test]
    fn prompt_blocks_are_distinct() {
        let blocks: Vec<_> = Personality::ALL
            .into_iter()
            .map(Personality::prompt_block)
            .collect();
        assert_ne!(blocks[0], blocks[1]);
        assert_ne!(blocks[1], blocks[2]);
    }
}
