use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One of the Big-Five dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Trait {
    O,
    C,
    E,
    A,
    N,
}

impl Trait {
    pub const ALL: [Trait; 5] = [Trait::O, Trait::C, Trait::E, Trait::A, Trait::N];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::O => "O",
            Trait::C => "C",
            Trait::E => "E",
            Trait::A => "A",
            Trait::N => "N",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Trait::O => "openness",
            Trait::C => "conscientiousness",
            Trait::E => "extraversion",
            Trait::A => "agreeableness",
            Trait::N => "neuroticism",
        }
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable catalog item. Loaded once at startup from the embedded
/// question bank; never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "trait")]
    pub trait_: Trait,
    pub facet: String,
    pub reverse: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

pub const MIN_QUESTIONS_PER_TRAIT: usize = 3;
