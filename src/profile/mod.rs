//! Mapping profiles: the declarative description of a conversion run

mod loader;
pub mod model;
pub mod named;

pub use loader::{load_profile, parse_profile_json};
pub use model::{
    non_blank_field, AttributeMapping, CatastrophicCap, EliteCap, ExperienceFactorSpec,
    FallbackMethod, FallbackRule, GroupWeights, MappingMethod, MappingProfile,
    NormalizationRules, PiecewiseRange, PiecewiseSpec, RandomVariation, ReportingSpec,
    RoleCoherence, RoundingPolicy, Scale, ScaleSet, VarianceClamp, EXPERIENCE_FACTOR,
};
pub use named::NamedMap;
