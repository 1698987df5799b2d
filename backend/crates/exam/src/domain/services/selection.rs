//! Question selection

use crate::domain::entities::Question;
use crate::domain::value_objects::Difficulty;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;

/// Levels to search, nearest first: exact, +1, -1, +2, -2, ...
///
/// Each level appears once; out-of-range neighbours are skipped.
pub fn search_order(target: Difficulty) -> Vec<Difficulty> {
    let base = target.level() as i32;
    let span = (Difficulty::MAX.level() - Difficulty::MIN.level()) as i32;
    let mut order = vec![target];

    for distance in 1..=span {
        for level in [base + distance, base - distance] {
            if let Some(d) = u8::try_from(level).ok().and_then(Difficulty::new) {
                order.push(d);
            }
        }
    }
    order
}

/// Pick one question from a candidate pool
///
/// Skips the previously asked question and questions already answered
/// correctly. If that leaves nothing, falls back to the first candidate.
/// Answer options of the result are shuffled.
pub fn pick<R: Rng + ?Sized>(
    candidates: Vec<Question>,
    last_question_id: Option<i64>,
    correct_ids: &HashSet<i64>,
    rng: &mut R,
) -> Option<Question> {
    let eligible: Vec<&Question> = candidates
        .iter()
        .filter(|q| Some(q.id) != last_question_id && !correct_ids.contains(&q.id))
        .collect();

    let mut chosen = match eligible.choose(rng) {
        Some(q) => (*q).clone(),
        None => candidates.into_iter().next()?,
    };
    chosen.options.shuffle(rng);
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AnswerOption;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn q(id: i64) -> Question {
        Question {
            id,
            text: format!("question {id}"),
            topic: "t".to_string(),
            difficulty: Difficulty::MIN,
            options: (0..4)
                .map(|n| AnswerOption {
                    id: id * 10 + n,
                    content: n.to_string(),
                    is_correct: n == 0,
                    explanation: None,
                })
                .collect(),
        }
    }

    fn levels(order: &[Difficulty]) -> Vec<u8> {
        order.iter().map(|d| d.level()).collect()
    }

    #[test]
    fn test_search_order_from_middle() {
        let order = search_order(Difficulty::new(5).unwrap());
        assert_eq!(levels(&order), vec![5, 6, 4, 7, 3, 8, 2, 9, 1, 10]);
    }

    #[test]
    fn test_search_order_from_edges() {
        assert_eq!(
            levels(&search_order(Difficulty::MIN)),
            (1..=10).collect::<Vec<u8>>()
        );
        assert_eq!(
            levels(&search_order(Difficulty::MAX)),
            (1..=10).rev().collect::<Vec<u8>>()
        );
    }

    #[test]
    fn test_pick_skips_last_and_correct() {
        let mut rng = StdRng::seed_from_u64(1);
        let correct = HashSet::from([2]);
        for _ in 0..20 {
            let picked = pick(vec![q(1), q(2), q(3)], Some(1), &correct, &mut rng).unwrap();
            assert_eq!(picked.id, 3);
            assert_eq!(picked.options.len(), 4);
        }
    }

    #[test]
    fn test_pick_falls_back_to_first() {
        let mut rng = StdRng::seed_from_u64(2);
        let correct = HashSet::from([2]);
        let picked = pick(vec![q(1), q(2)], Some(1), &correct, &mut rng).unwrap();
        assert_eq!(picked.id, 1);
    }

    #[test]
    fn test_pick_empty_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(pick(Vec::new(), None, &HashSet::new(), &mut rng).is_none());
    }
}
