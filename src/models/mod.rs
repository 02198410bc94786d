pub mod assessment;
pub mod auth;
pub mod explanation;
pub mod persona;
pub mod profile;
pub mod question;
pub mod scoring;

pub use assessment::{
    Assessment, AssessmentScores, AssessmentSummary, CanonicalAssessmentResponse, CanonicalMetadata,
    CreateAssessmentRequest, DominantInfo, HistoryEntry, PagedHistory,
};
pub use auth::{
    LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest, SessionInfo,
    SignupRequest, SignupResponse, UpdatePasswordRequest,
};
pub use explanation::Explanation;
pub use persona::Persona;
pub use profile::Profile;
pub use question::{Question, Trait, MIN_QUESTIONS_PER_TRAIT};
pub use scoring::{
    Ocean, ResponseSet, ScoringMetadata, ScoringResult, TraitMap, ValidationReport,
    ValidationWarning, ENGINE_VERSION, SCORING_VERSION,
};
