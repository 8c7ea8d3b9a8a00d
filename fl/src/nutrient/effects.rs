//! Pure countdown helpers for active nutrient effects

use std::collections::HashMap;

use crate::domain::ActiveNutrientEffect;

/// Count every effect down by `seconds` (floor 0) and drop the ones that expired.
/// Order of the surviving effects is preserved.
pub fn decay(effects: &[ActiveNutrientEffect], seconds: u32) -> Vec<ActiveNutrientEffect> {
    effects
        .iter()
        .map(|effect| ActiveNutrientEffect {
            remaining_seconds: effect.remaining_seconds.saturating_sub(seconds),
            ..effect.clone()
        })
        .filter(|effect| !effect.is_expired())
        .collect()
}

/// Effects in `stored` beyond those accounted for by `baseline`, matched per nutrient id.
///
/// Used to find effects appended to a plant since a countdown last wrote it.
/// Duplicates of the same nutrient are counted, not collapsed.
pub fn additions_since(
    stored: &[ActiveNutrientEffect],
    baseline: &[ActiveNutrientEffect],
) -> Vec<ActiveNutrientEffect> {
    let mut known: HashMap<&str, usize> = HashMap::new();
    for effect in baseline {
        *known.entry(effect.nutrient_id.as_str()).or_default() += 1;
    }
    stored
        .iter()
        .filter(|effect| match known.get_mut(effect.nutrient_id.as_str()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Render remaining time as zero-padded `MM:SS`. Minutes are not wrapped at 60.
pub fn format_remaining(seconds: Option<u32>) -> String {
    let seconds = seconds.unwrap_or(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn effect(id: &str, remaining: u32) -> ActiveNutrientEffect {
        ActiveNutrientEffect::new(id, id.to_uppercase(), remaining)
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Some(65)), "01:05");
        assert_eq!(format_remaining(Some(5)), "00:05");
        assert_eq!(format_remaining(Some(0)), "00:00");
        assert_eq!(format_remaining(None), "00:00");
        assert_eq!(format_remaining(Some(3600)), "60:00");
    }

    #[test]
    fn test_decay_drops_expired_and_keeps_order() {
        let effects = vec![effect("a", 3), effect("b", 1), effect("c", 2)];
        let next = decay(&effects, 1);
        assert_eq!(next, vec![effect("a", 2), effect("c", 1)]);
    }

    #[test]
    fn test_additions_since_matches_by_nutrient() {
        let baseline = vec![effect("a", 8)];
        // Stored copy of "a" may lag behind the countdown
        let stored = vec![effect("a", 9), effect("b", 60), effect("a", 30)];
        assert_eq!(additions_since(&stored, &baseline), vec![effect("b", 60), effect("a", 30)]);
        assert!(additions_since(&baseline, &baseline).is_empty());
        assert!(additions_since(&[], &baseline).is_empty());
    }

    #[test]
    fn test_decay_of_empty_is_empty() {
        assert!(decay(&[], 1).is_empty());
    }

    #[test]
    fn test_zero_step_only_drops_already_expired() {
        let effects = vec![effect("a", 0), effect("b", 4)];
        assert_eq!(decay(&effects, 0), vec![effect("b", 4)]);
    }

    proptest! {
        #[test]
        fn prop_decay_converges_after_max_ticks(remaining in prop::collection::vec(1u32..200, 0..12)) {
            let mut effects: Vec<_> = remaining
                .iter()
                .enumerate()
                .map(|(i, &r)| effect(&format!("n{}", i), r))
                .collect();
            let max = remaining.iter().copied().max().unwrap_or(0);

            for tick in 0..max {
                let before = effects.len();
                effects = decay(&effects, 1);
                prop_assert!(effects.len() <= before);
                prop_assert!(effects.iter().all(|e| e.remaining_seconds > 0));
                prop_assert!(effects.iter().all(|e| e.remaining_seconds < max - tick));
            }
            prop_assert!(effects.is_empty());
        }
    }
}
