use std::collections::HashMap;

use crate::models::{Question, Trait};
use crate::utils::error::{ApiError, ApiResult};

/// Immutable catalog of questions, embedded into the binary at compile
/// time and parsed once at startup. Never mutated afterward — reads are
/// lock-free since the bank is behind an `Arc` with no interior mutability.
static QUESTIONS_JSON: &str = include_str!("../../data/questions.json");

pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<String, usize>,
    trait_total_weight: HashMap<Trait, f64>,
    facet_total_weight: HashMap<String, f64>,
}

impl QuestionBank {
    pub fn load() -> ApiResult<Self> {
        let questions: Vec<Question> = serde_json::from_str(QUESTIONS_JSON)
            .map_err(|e| ApiError::internal_error(format!("invalid question catalog: {e}")))?;
        Self::from_questions(questions)
    }

    fn from_questions(questions: Vec<Question>) -> ApiResult<Self> {
        let mut by_id = HashMap::new();
        let mut trait_total_weight: HashMap<Trait, f64> = HashMap::new();
        let mut facet_total_weight: HashMap<String, f64> = HashMap::new();

        for (idx, q) in questions.iter().enumerate() {
            if by_id.insert(q.id.clone(), idx).is_some() {
                return Err(ApiError::internal_error(format!("duplicate question id {}", q.id)));
            }
            if q.weight <= 0.0 {
                return Err(ApiError::internal_error(format!("question {} has non-positive weight", q.id)));
            }
            *trait_total_weight.entry(q.trait_).or_insert(0.0) += q.weight;
            *facet_total_weight.entry(q.facet.clone()).or_insert(0.0) += q.weight;
        }

        for t in Trait::ALL {
            let count = questions.iter().filter(|q| q.trait_ == t).count();
            if count < 3 {
                return Err(ApiError::internal_error(format!(
                    "trait {t} has fewer than 3 catalog items"
                )));
            }
        }

        Ok(Self { questions, by_id, trait_total_weight, facet_total_weight })
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.by_id.get(id).map(|&idx| &self.questions[idx])
    }

    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    pub fn trait_total_weight(&self, t: Trait) -> f64 {
        *self.trait_total_weight.get(&t).unwrap_or(&0.0)
    }

    pub fn facet_total_weight(&self, facet: &str) -> f64 {
        *self.facet_total_weight.get(facet).unwrap_or(&0.0)
    }

    /// Returns up to `limit` items, trait-balanced by round-robin draw
    /// across O/C/E/A/N so that `limit=30` yields 5..7 per trait.
    pub fn ordered(&self, limit: usize) -> Vec<Question> {
        let mut by_trait: HashMap<Trait, Vec<&Question>> = HashMap::new();
        for q in &self.questions {
            by_trait.entry(q.trait_).or_default().push(q);
        }
        let mut result = Vec::with_capacity(limit);
        let mut cursors: HashMap<Trait, usize> = HashMap::new();
        'outer: loop {
            for t in Trait::ALL {
                if result.len() >= limit {
                    break 'outer;
                }
                let bucket = by_trait.get(&t).cloned().unwrap_or_default();
                let cursor = cursors.entry(t).or_insert(0);
                if let Some(q) = bucket.get(*cursor) {
                    result.push((*q).clone());
                    *cursor += 1;
                }
            }
            if cursors.values().zip(Trait::ALL).all(|(c, t)| {
                *c >= by_trait.get(&t).map(|v| v.len()).unwrap_or(0)
            }) {
                break;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_the_embedded_catalog() {
        let bank = QuestionBank::load().unwrap();
        assert_eq!(bank.all().len(), 180);
        for t in Trait::ALL {
            assert!(bank.trait_total_weight(t) >= 3.0);
        }
    }

    #[test]
    fn ordered_limit_30_is_balanced() {
        let bank = QuestionBank::load().unwrap();
        let items = bank.ordered(30);
        assert_eq!(items.len(), 30);
        let mut counts: HashMap<Trait, usize> = HashMap::new();
        for q in &items {
            *counts.entry(q.trait_).or_insert(0) += 1;
        }
        for t in Trait::ALL {
            let c = *counts.get(&t).unwrap_or(&0);
            assert!((5..=7).contains(&c), "trait {t} had {c} items");
        }
    }
}
