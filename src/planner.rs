use rand::seq::SliceRandom;
use rand::RngCore;

use crate::level::CefrLevel;
use crate::question::QuestionType;

/// Default length of one level attempt
pub const QUESTIONS_PER_LEVEL: usize = 10;

/// Reading/sentence pairs per level: harder levels lean on structure
pub fn structural_pairs(level: CefrLevel) -> usize {
    match level {
        CefrLevel::A1 | CefrLevel::A2 => 2,
        CefrLevel::B1 | CefrLevel::B2 => 3,
        CefrLevel::C1 | CefrLevel::C2 => 4,
    }
}

/// Vocabulary types cycled through to fill the non-structural slots
pub fn vocabulary_rotation(level: CefrLevel) -> &'static [QuestionType] {
    const BASIC: &[QuestionType] = &[
        QuestionType::Meaning,
        QuestionType::Usage,
        QuestionType::Matching,
    ];
    const EXTENDED: &[QuestionType] = &[
        QuestionType::Meaning,
        QuestionType::Usage,
        QuestionType::Matching,
        QuestionType::Synonym,
        QuestionType::Antonym,
    ];
    match level {
        CefrLevel::A1 | CefrLevel::A2 => BASIC,
        _ => EXTENDED,
    }
}

/// Question types for one level attempt, in canonical (unshuffled) order
pub fn target_distribution(level: CefrLevel, quota: usize) -> Vec<QuestionType> {
    let pairs = structural_pairs(level).min(quota / 2);
    let mut plan = Vec::with_capacity(quota);
    for _ in 0..pairs {
        plan.push(QuestionType::ReadingComprehension);
        plan.push(QuestionType::SentenceFormation);
    }
    plan.extend(
        vocabulary_rotation(level)
            .iter()
            .copied()
            .cycle()
            .take(quota - plan.len()),
    );
    plan
}

/// `target_distribution` in random order
pub fn plan_level(level: CefrLevel, quota: usize, rng: &mut dyn RngCore) -> Vec<QuestionType> {
    let mut plan = target_distribution(level, quota);
    plan.shuffle(rng);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;

    fn counts(plan: &[QuestionType]) -> HashMap<QuestionType, usize> {
        plan.iter().copied().counts()
    }

    #[test]
    fn b1_has_six_structural_and_four_vocabulary() {
        let plan = target_distribution(CefrLevel::B1, QUESTIONS_PER_LEVEL);
        let c = counts(&plan);
        assert_eq!(plan.len(), 10);
        assert_eq!(c[&QuestionType::ReadingComprehension], 3);
        assert_eq!(c[&QuestionType::SentenceFormation], 3);
        assert_eq!(plan.iter().filter(|t| t.is_vocabulary()).count(), 4);
        assert_eq!(c[&QuestionType::Meaning], 1);
        assert_eq!(c[&QuestionType::Synonym], 1);
        assert!(!c.contains_key(&QuestionType::Antonym));
    }

    #[test]
    fn structural_share_grows_with_level() {
        let structural = |level| {
            target_distribution(level, QUESTIONS_PER_LEVEL)
                .iter()
                .filter(|t| t.is_structural())
                .count()
        };
        assert_eq!(structural(CefrLevel::A1), 4);
        assert_eq!(structural(CefrLevel::A2), 4);
        assert_eq!(structural(CefrLevel::B2), 6);
        assert_eq!(structural(CefrLevel::C1), 8);
        assert_eq!(structural(CefrLevel::C2), 8);
    }

    #[test]
    fn lower_levels_skip_synonyms_and_antonyms() {
        let c = counts(&target_distribution(CefrLevel::A2, QUESTIONS_PER_LEVEL));
        assert_eq!(c[&QuestionType::Meaning], 2);
        assert_eq!(c[&QuestionType::Usage], 2);
        assert_eq!(c[&QuestionType::Matching], 2);
        assert!(!c.contains_key(&QuestionType::Synonym));
    }

    #[test]
    fn shuffling_keeps_type_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        for level in CefrLevel::ALL {
            let plan = plan_level(level, QUESTIONS_PER_LEVEL, &mut rng);
            assert_eq!(
                counts(&plan),
                counts(&target_distribution(level, QUESTIONS_PER_LEVEL))
            );
        }
    }

    #[test]
    fn small_quota_keeps_pairs_balanced() {
        let plan = target_distribution(CefrLevel::C2, 5);
        let c = counts(&plan);
        assert_eq!(plan.len(), 5);
        assert_eq!(c[&QuestionType::ReadingComprehension], 2);
        assert_eq!(c[&QuestionType::SentenceFormation], 2);
        assert_eq!(c[&QuestionType::Meaning], 1);
    }
}
