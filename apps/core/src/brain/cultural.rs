//! Cultural adaptation tagging.
//!
//! Marks which cultural registers a final reply touches. Audit metadata only:
//! the text is never modified.

use std::collections::BTreeSet;

use super::assessment::{CulturalAdaptation, GeneratedResponse};

/// Religious references (`Allah`, `in sha Allah`)
const RELIGIOUS_MARKERS: &[&str] = &["الله", "إن شاء الله"];

/// Family members and relations
const FAMILY_MARKERS: &[&str] = &["عائلة", "والدين", "إخوان", "أخوات"];

/// Community, customs, traditions
const SOCIAL_MARKERS: &[&str] = &["مجتمع", "عادات", "تقاليد"];

/// Mental-health vocabulary
const THERAPEUTIC_MARKERS: &[&str] = &["علاج", "نفسي", "استشارة", "دعم"];

const VOCABULARIES: &[(CulturalAdaptation, &[&str])] = &[
    (CulturalAdaptation::ReligiousSensitivity, RELIGIOUS_MARKERS),
    (CulturalAdaptation::FamilyContext, FAMILY_MARKERS),
    (CulturalAdaptation::SocialNorms, SOCIAL_MARKERS),
    (CulturalAdaptation::TherapeuticTerminology, THERAPEUTIC_MARKERS),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CulturalAdaptationTagger;

impl CulturalAdaptationTagger {
    pub fn new() -> Self {
        Self
    }

    /// Tags whose vocabulary appears in `text`.
    pub fn tags_for(&self, text: &str) -> BTreeSet<CulturalAdaptation> {
        VOCABULARIES
            .iter()
            .filter(|(_, markers)| markers.iter().any(|m| text.contains(m)))
            .map(|(tag, _)| *tag)
            .collect()
    }

    /// Adds the tags for `response.text` to its existing adaptations.
    pub fn tag(&self, response: &mut GeneratedResponse) {
        let tags = self.tags_for(&response.text);
        response.cultural_adaptations.extend(tags);
    }
}
