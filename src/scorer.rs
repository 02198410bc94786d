//! Pure, versioned scoring function: `ResponseSet` -> `ScoringResult`.
//!
//! No I/O. Ported from the weighting/threshold algorithm in the original
//! Python scoring engine, with MBTI ties resolved deterministically to the
//! "high" letter on every axis — see DESIGN.md Open Question (a).

use std::collections::HashMap;

use sha2_stub::sha256_hex;

use crate::models::question::MIN_QUESTIONS_PER_TRAIT;
use crate::models::{
    Ocean, ResponseSet, ScoringMetadata, ScoringResult, Trait, ValidationReport, ValidationWarning,
    ENGINE_VERSION, SCORING_VERSION,
};
use crate::services::question_bank::QuestionBank;

/// Accumulates weighted sums per trait/facet over one scoring pass.
#[derive(Default)]
struct Accumulator {
    sum: f64,
    denom: f64,
}

pub struct Scorer<'a> {
    bank: &'a QuestionBank,
}

impl<'a> Scorer<'a> {
    pub fn new(bank: &'a QuestionBank) -> Self {
        Self { bank }
    }

    pub fn score(&self, responses: &ResponseSet, quiz_type: &str) -> ScoringResult {
        let mut trait_acc: HashMap<Trait, Accumulator> = HashMap::new();
        let mut facet_acc: HashMap<String, Accumulator> = HashMap::new();
        let mut coverage: HashMap<String, usize> = Trait::ALL.iter().map(|t| (t.as_str().to_string(), 0)).collect();
        let mut valid_count = 0usize;

        for (qid, &value) in responses {
            let Some(question) = self.bank.get(qid) else { continue };
            if !(1..=5).contains(&value) {
                continue;
            }
            valid_count += 1;
            *coverage.entry(question.trait_.as_str().to_string()).or_insert(0) += 1;

            let mut s = (value as f64 - 1.0) / 4.0;
            if question.reverse {
                s = 1.0 - s;
            }

            let t_acc = trait_acc.entry(question.trait_).or_default();
            t_acc.sum += question.weight * s;
            t_acc.denom += question.weight;

            let f_acc = facet_acc.entry(question.facet.clone()).or_default();
            f_acc.sum += question.weight * s;
            f_acc.denom += question.weight;
        }

        let mut trait_scores: HashMap<Trait, Option<f64>> = HashMap::new();
        let mut trait_confidence: HashMap<String, f64> = HashMap::new();
        let mut traits_with_data = Vec::new();

        for t in Trait::ALL {
            let total_weight = self.bank.trait_total_weight(t);
            match trait_acc.get(&t) {
                Some(acc) if acc.denom >= MIN_QUESTIONS_PER_TRAIT as f64 => {
                    let score = round3(acc.sum / acc.denom);
                    trait_scores.insert(t, Some(score));
                    let conf = if total_weight > 0.0 { round3(acc.denom / total_weight) } else { 0.0 };
                    trait_confidence.insert(t.as_str().to_string(), conf);
                    traits_with_data.push(t.as_str().to_string());
                },
                _ => {
                    trait_scores.insert(t, None);
                    trait_confidence.insert(t.as_str().to_string(), 0.0);
                },
            }
        }

        let mut facet_scores: HashMap<String, Option<f64>> = HashMap::new();
        let mut facet_confidence: HashMap<String, f64> = HashMap::new();
        for (facet, acc) in &facet_acc {
            if acc.denom >= 1.0 {
                facet_scores.insert(facet.clone(), Some(round3(acc.sum / acc.denom)));
                let total = self.bank.facet_total_weight(facet);
                facet_confidence
                    .insert(facet.clone(), if total > 0.0 { round3(acc.denom / total) } else { 0.0 });
            } else {
                facet_scores.insert(facet.clone(), None);
                facet_confidence.insert(facet.clone(), 0.0);
            }
        }
        // Facets never touched this response set still report as absent.
        for q in self.bank.all() {
            facet_scores.entry(q.facet.clone()).or_insert(None);
            facet_confidence.entry(q.facet.clone()).or_insert(0.0);
        }

        let ocean = Ocean {
            o: trait_scores[&Trait::O],
            c: trait_scores[&Trait::C],
            e: trait_scores[&Trait::E],
            a: trait_scores[&Trait::A],
            n: trait_scores[&Trait::N],
        };

        let has_complete_profile = Trait::ALL.iter().all(|t| trait_scores[t].is_some());

        let mbti_proxy = if has_complete_profile {
            Some(derive_mbti(&ocean))
        } else {
            None
        };

        let neuroticism_level = ocean.n.map(neuroticism_level_for);
        let personality_code = match (&mbti_proxy, &neuroticism_level) {
            (Some(mbti), Some(level)) => {
                Some(format!("{mbti}-{}", &level[0..1]))
            },
            _ => None,
        };

        let persona_id = mbti_proxy.clone().map(|m| m.to_lowercase()).unwrap_or_else(|| "unknown".to_string());

        let non_zero_confidences: Vec<f64> =
            trait_confidence.values().copied().filter(|c| *c > 0.0).collect();
        let confidence = if non_zero_confidences.is_empty() {
            0.0
        } else {
            round3(non_zero_confidences.iter().sum::<f64>() / non_zero_confidences.len() as f64)
        };

        let top_facets = top_facets(&facet_scores, 5);

        let traits: HashMap<String, Option<f64>> =
            Trait::ALL.iter().map(|t| (t.long_name().to_string(), trait_scores[t])).collect();

        let quiz_type_effective =
            if quiz_type == "auto" { infer_quiz_type(responses.len()) } else { quiz_type.to_string() };

        let input_hash = sha256_hex(&sorted_debug(responses.iter().map(|(k, v)| (k.clone(), format!("{v:?}")))));
        let output_hash = sha256_hex(&format!(
            "{}{}",
            sorted_debug(trait_scores.iter().map(|(t, v)| (t.long_name().to_string(), format!("{v:?}")))),
            sorted_debug(facet_scores.iter().map(|(k, v)| (k.clone(), format!("{v:?}")))),
        ));

        ScoringResult {
            ocean,
            traits,
            facets: facet_scores,
            persona_id,
            mbti_proxy,
            confidence,
            trait_confidence,
            facet_confidence,
            top_facets,
            personality_code,
            neuroticism_level,
            has_complete_profile,
            traits_with_data,
            coverage,
            responses_count: valid_count,
            metadata: ScoringMetadata {
                scoring_version: SCORING_VERSION.to_string(),
                engine_version: ENGINE_VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                quiz_type: quiz_type_effective,
                input_hash,
                output_hash,
            },
        }
    }

    /// Structured pre-flight report: coverage, unknown ids, out-of-range
    /// values, and an overall validity verdict used by the Validators
    /// component before a response set reaches the Scorer.
    pub fn validate_responses(&self, responses: &ResponseSet) -> ValidationReport {
        let mut coverage: HashMap<String, usize> =
            Trait::ALL.iter().map(|t| (t.as_str().to_string(), 0)).collect();
        let mut warnings = Vec::new();
        let mut unknown_ids = Vec::new();
        let mut out_of_range = Vec::new();
        let mut valid_responses = 0usize;

        for (qid, &value) in responses {
            match self.bank.get(qid) {
                None => unknown_ids.push(qid.clone()),
                Some(q) => {
                    if !(1..=5).contains(&value) {
                        out_of_range.push(qid.clone());
                    } else {
                        valid_responses += 1;
                        *coverage.entry(q.trait_.as_str().to_string()).or_insert(0) += 1;
                    }
                },
            }
        }

        if !unknown_ids.is_empty() {
            warnings.push(ValidationWarning {
                severity: "error".to_string(),
                kind: "invalid_question_ids".to_string(),
                detail: format!("unknown question ids: {}", unknown_ids.join(", ")),
            });
        }
        if !out_of_range.is_empty() {
            warnings.push(ValidationWarning {
                severity: "error".to_string(),
                kind: "out_of_range_values".to_string(),
                detail: format!("values outside [1,5] for: {}", out_of_range.join(", ")),
            });
        }

        let mut missing_traits = Vec::new();
        for t in Trait::ALL {
            let count = *coverage.get(t.as_str()).unwrap_or(&0);
            if count < MIN_QUESTIONS_PER_TRAIT {
                missing_traits.push(t.as_str().to_string());
                warnings.push(ValidationWarning {
                    severity: "error".to_string(),
                    kind: "missing_trait".to_string(),
                    detail: format!(
                        "trait {t} has only {count} valid answers, needs >= {MIN_QUESTIONS_PER_TRAIT}"
                    ),
                });
            }
        }

        let total_answered: usize = coverage.values().sum::<usize>() + out_of_range.len() + unknown_ids.len();
        let low_coverage_ratio = if total_answered > 0 {
            valid_responses as f64 / total_answered as f64
        } else {
            0.0
        };
        if total_answered > 0 && low_coverage_ratio < 0.5 {
            warnings.push(ValidationWarning {
                severity: "warning".to_string(),
                kind: "low_coverage".to_string(),
                detail: format!("only {:.0}% of submitted answers were usable", low_coverage_ratio * 100.0),
            });
        }

        let is_valid = missing_traits.is_empty() && unknown_ids.is_empty();

        ValidationReport {
            is_valid,
            warnings,
            coverage,
            missing_traits,
            total_responses: responses.len(),
            valid_responses,
        }
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Exposed so callers reconstructing a `personality_code` from a
/// persisted assessment's `trait_scores` (rather than a fresh
/// `ScoringResult`) can reproduce the same classification deterministically.
pub fn neuroticism_level_for(n: f64) -> String {
    if n < 0.35 {
        "Stable".to_string()
    } else if n < 0.65 {
        "Balanced".to_string()
    } else {
        "Sensitive".to_string()
    }
}

/// `personality_code = mbti + "-" + level[0]`, the same join `Scorer::score`
/// performs inline — exposed for reuse against already-persisted rows.
pub fn personality_code(mbti: &str, neuroticism_level: &str) -> String {
    format!("{mbti}-{}", &neuroticism_level[0..1])
}

/// Fixed axis rules: E/I from E, N/S from O, F/T from A, J/P from C.
/// Exact ties (== 0.5) resolve to the documented "high" letter on every
/// axis — see DESIGN.md Open Question (a).
fn derive_mbti(ocean: &Ocean) -> String {
    let e = ocean.e.expect("mbti only derived when all traits present");
    let o = ocean.o.expect("mbti only derived when all traits present");
    let a = ocean.a.expect("mbti only derived when all traits present");
    let c = ocean.c.expect("mbti only derived when all traits present");

    let axis1 = if e >= 0.5 { 'E' } else { 'I' };
    let axis2 = if o >= 0.5 { 'N' } else { 'S' };
    let axis3 = if a >= 0.5 { 'F' } else { 'T' };
    let axis4 = if c >= 0.5 { 'J' } else { 'P' };

    format!("{axis1}{axis2}{axis3}{axis4}")
}

fn top_facets(facets: &HashMap<String, Option<f64>>, n: usize) -> Vec<String> {
    let mut scored: Vec<(&String, f64)> =
        facets.iter().filter_map(|(k, v)| v.map(|score| (k, score))).collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

fn infer_quiz_type(responses_len: usize) -> String {
    if responses_len >= 60 { "full180".to_string() } else { "quick".to_string() }
}

/// Key-sorted `"key=value;"` rendering so hashing a `HashMap`'s contents
/// doesn't depend on its randomized per-process iteration order.
fn sorted_debug(entries: impl Iterator<Item = (String, String)>) -> String {
    let mut pairs: Vec<(String, String)> = entries.collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.into_iter().map(|(k, v)| format!("{k}={v};")).collect()
}

/// Small dependency-free stand-in for a cryptographic digest: the Store
/// and replay checks only need a stable, collision-resistant-enough
/// fingerprint of the input/output for version-comparison purposes, not
/// a security guarantee, so a non-cryptographic hash avoids pulling in a
/// digest crate the rest of the stack does not otherwise need.
mod sha2_stub {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    pub fn sha256_hex(input: &str) -> String {
        let mut hasher = DefaultHasher::new();
        input.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> QuestionBank {
        QuestionBank::load().unwrap()
    }

    #[test]
    fn determinism_of_scoring() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let responses: ResponseSet = bank.all().iter().take(30).map(|q| (q.id.clone(), 3)).collect();
        let a = scorer.score(&responses, "quick");
        let b = scorer.score(&responses, "quick");
        assert_eq!(a.ocean.o, b.ocean.o);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.mbti_proxy, b.mbti_proxy);
        assert_eq!(a.metadata.input_hash, b.metadata.input_hash);
        assert_eq!(a.metadata.output_hash, b.metadata.output_hash);
    }

    #[test]
    fn no_midpoint_defaulting_below_threshold() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        // Exactly 2 items for O, none for the rest.
        let o_items: Vec<_> = bank.all().iter().filter(|q| q.trait_ == Trait::O).take(2).collect();
        let responses: ResponseSet = o_items.iter().map(|q| (q.id.clone(), 3)).collect();
        let result = scorer.score(&responses, "quick");
        assert_eq!(result.ocean.o, None);
        assert!(!result.has_complete_profile);
    }

    #[test]
    fn covering_threshold_yields_defined_score_not_silently_imputed() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let o_items: Vec<_> = bank.all().iter().filter(|q| q.trait_ == Trait::O).take(3).collect();
        let responses: ResponseSet = o_items.iter().map(|q| (q.id.clone(), 3)).collect();
        let result = scorer.score(&responses, "quick");
        assert!(result.ocean.o.is_some());
    }

    #[test]
    fn balanced_uniform_input_yields_neutral_scores() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let responses: ResponseSet = bank.all().iter().map(|q| (q.id.clone(), 3)).collect();
        let result = scorer.score(&responses, "quick");
        for t in Trait::ALL {
            assert_eq!(result.traits[&t.long_name().to_string()], Some(0.5));
        }
        assert!(result.has_complete_profile);
    }

    #[test]
    fn reverse_scoring_symmetry() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let responses: ResponseSet = bank.all().iter().map(|q| (q.id.clone(), 2)).collect();
        let flipped: ResponseSet = bank.all().iter().map(|q| (q.id.clone(), 6 - 2)).collect();

        let r1 = scorer.score(&responses, "quick");
        let r2 = scorer.score(&flipped, "quick");

        for t in Trait::ALL {
            let s1 = r1.traits[&t.long_name().to_string()].unwrap();
            let s2 = r2.traits[&t.long_name().to_string()].unwrap();
            assert!((s1 - (1.0 - s2)).abs() < 1e-9, "trait {t}: {s1} vs 1-{s2}");
        }
    }

    #[test]
    fn mbti_completeness_gate() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let full: ResponseSet = bank.all().iter().map(|q| (q.id.clone(), 3)).collect();
        assert!(scorer.score(&full, "quick").mbti_proxy.is_some());

        let only_o: ResponseSet =
            bank.all().iter().filter(|q| q.trait_ == Trait::O).map(|q| (q.id.clone(), 3)).collect();
        assert!(scorer.score(&only_o, "quick").mbti_proxy.is_none());
    }

    #[test]
    fn validator_rejects_all_one_trait_sets() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let only_o: ResponseSet =
            bank.all().iter().filter(|q| q.trait_ == Trait::O).take(30).map(|q| (q.id.clone(), 3)).collect();
        let report = scorer.validate_responses(&only_o);
        assert!(!report.is_valid);
        for t in ["C", "E", "A", "N"] {
            assert!(report.missing_traits.contains(&t.to_string()));
        }
        assert_eq!(report.coverage["O"], 30);
        assert_eq!(report.coverage["C"], 0);
    }

    #[test]
    fn all_absent_result_has_no_complete_profile() {
        let bank = bank();
        let scorer = Scorer::new(&bank);
        let empty: ResponseSet = HashMap::new();
        let result = scorer.score(&empty, "quick");
        assert!(!result.has_complete_profile);
        assert_eq!(result.responses_count, 0);
    }
}
