use std::collections::HashMap;

use crate::models::{Ocean, Persona};
use crate::utils::error::{ApiError, ApiResult};

static PERSONAS_JSON: &str = include_str!("../../data/personas.json");

/// Pure lookup: OCEAN vector -> (persona, confidence). Never fails; an
/// absent vector maps to the "unknown" fallback persona.
pub struct PersonaRegistry {
    by_tag: HashMap<String, Persona>,
}

impl PersonaRegistry {
    pub fn load() -> ApiResult<Self> {
        let personas: Vec<Persona> = serde_json::from_str(PERSONAS_JSON)
            .map_err(|e| ApiError::internal_error(format!("invalid persona catalog: {e}")))?;
        let by_tag = personas.into_iter().map(|p| (p.tag.to_lowercase(), p)).collect();
        Ok(Self { by_tag })
    }

    /// `ocean` values may arrive in 0-1 or 0-100; both are normalized to
    /// the canonical 0-1 range before lookup.
    pub fn map(&self, ocean: &Ocean) -> (Persona, f64) {
        let normalize = |v: Option<f64>| v.map(|x| if x > 1.0 { x / 100.0 } else { x });
        let (o, c, e, a) = (normalize(ocean.o), normalize(ocean.c), normalize(ocean.e), normalize(ocean.a));

        let (Some(e), Some(o), Some(a), Some(c)) = (e, o, a, c) else {
            return (Persona::unknown(), 0.0);
        };

        let axis1 = if e >= 0.5 { 'E' } else { 'I' };
        let axis2 = if o >= 0.5 { 'N' } else { 'S' };
        let axis3 = if a >= 0.5 { 'F' } else { 'T' };
        let axis4 = if c >= 0.5 { 'J' } else { 'P' };
        let tag = format!("{axis1}{axis2}{axis3}{axis4}").to_lowercase();

        match self.by_tag.get(&tag) {
            Some(persona) => {
                let distance = [(e - 0.5).abs(), (o - 0.5).abs(), (a - 0.5).abs(), (c - 0.5).abs()]
                    .iter()
                    .sum::<f64>()
                    / 4.0;
                // Proximity to the canonical centroid: further from the
                // midpoint on every axis = a more confidently matched type.
                (persona.clone(), (0.5 + distance).min(1.0))
            },
            None => (Persona::unknown(), 0.0),
        }
    }

    pub fn by_tag(&self, tag: &str) -> Option<&Persona> {
        self.by_tag.get(&tag.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_vector_maps_to_unknown() {
        let registry = PersonaRegistry::load().unwrap();
        let ocean = Ocean { o: None, c: Some(0.5), e: Some(0.5), a: Some(0.5), n: Some(0.5) };
        let (persona, confidence) = registry.map(&ocean);
        assert_eq!(persona.tag, "unknown");
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn full_vector_maps_to_a_known_persona() {
        let registry = PersonaRegistry::load().unwrap();
        let ocean = Ocean { o: Some(0.8), c: Some(0.8), e: Some(0.8), a: Some(0.8), n: Some(0.2) };
        let (persona, _) = registry.map(&ocean);
        assert_ne!(persona.tag, "unknown");
    }

    #[test]
    fn accepts_0_to_100_scale() {
        let registry = PersonaRegistry::load().unwrap();
        let pct = Ocean { o: Some(80.0), c: Some(80.0), e: Some(80.0), a: Some(80.0), n: Some(20.0) };
        let unit = Ocean { o: Some(0.8), c: Some(0.8), e: Some(0.8), a: Some(0.8), n: Some(0.2) };
        assert_eq!(registry.map(&pct).0.tag, registry.map(&unit).0.tag);
    }
}
