//! Core domain types for creature records.

use serde::{Deserialize, Serialize};

/// Separator between ability references inside `flat_abilities`.
pub const ABILITY_DELIMITER: char = '|';

/// Header row of the persisted record table.
pub const RECORD_HEADER: [&str; 5] = ["id", "name", "height", "weight", "flat_abilities"];

// ---------------------------------------------------------------------------
// Creature
// ---------------------------------------------------------------------------

/// One creature record moving through a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    /// Raw `|`-joined ability references, exactly as persisted.
    pub flat_abilities: String,
    /// Resolved effect descriptions, filled in by enrichment.
    #[serde(default)]
    pub effect_entries: Vec<String>,
}

impl Creature {
    /// Iterate the ability references held by this creature, skipping empty tokens.
    pub fn ability_refs(&self) -> impl Iterator<Item = &str> {
        self.flat_abilities
            .split(ABILITY_DELIMITER)
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Ability
// ---------------------------------------------------------------------------

/// A resolved ability document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
}

/// A single effect description in some language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    #[serde(default)]
    pub short_effect: String,
    #[serde(default)]
    pub language: NamedResource,
}

/// A `{ name, url }` pointer as returned by the ability endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl Ability {
    /// Effect texts in document order.
    pub fn effects(&self) -> impl Iterator<Item = &str> {
        self.effect_entries.iter().map(|e| e.effect.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature(flat: &str) -> Creature {
        Creature {
            id: 1,
            name: "bulbasaur".into(),
            height: 7,
            weight: 69,
            flat_abilities: flat.into(),
            effect_entries: Vec::new(),
        }
    }

    #[test]
    fn ability_refs_split_on_delimiter() {
        let c = creature("https://a/65/|https://a/34/");
        let refs: Vec<_> = c.ability_refs().collect();
        assert_eq!(refs, vec!["https://a/65/", "https://a/34/"]);
    }

    #[test]
    fn empty_flat_abilities_has_no_refs() {
        assert_eq!(creature("").ability_refs().count(), 0);
        assert_eq!(creature("|").ability_refs().count(), 0);
    }

    #[test]
    fn ability_deserializes_pokeapi_shape() {
        let json = r#"{
            "id": 65,
            "name": "overgrow",
            "effect_entries": [
                {"effect": "Boosts grass moves.", "short_effect": "Boost", "language": {"name": "en", "url": "https://x/language/9/"}},
                {"effect": "Verstärkt Pflanzen-Attacken.", "language": {"name": "de", "url": "https://x/language/6/"}}
            ]
        }"#;
        let ability: Ability = serde_json::from_str(json).unwrap();
        assert_eq!(ability.effect_entries.len(), 2);
        assert_eq!(ability.effect_entries[0].language.name, "en");
        assert_eq!(ability.effect_entries[1].short_effect, "");
        let effects: Vec<_> = ability.effects().collect();
        assert_eq!(effects[0], "Boosts grass moves.");
    }
}
