//! Tests for task spaces.
//!
//! - construction errors for every variant
//! - membership and enumeration
//! - encode/decode behaviour
//! - property tests over arbitrary spaces

use super::*;
use crate::error::SyncError;

// =============================================================================
// CONSTRUCTION
// =============================================================================

#[test]
fn test_discrete_zero_cardinality_rejected() {
    assert!(matches!(
        TaskSpace::discrete(0),
        Err(SyncError::InvalidTaskSpace(_))
    ));
}

#[test]
fn test_multi_discrete_rejects_empty_and_zero() {
    assert!(matches!(
        TaskSpace::multi_discrete(vec![]),
        Err(SyncError::InvalidTaskSpace(_))
    ));
    assert!(matches!(
        TaskSpace::multi_discrete(vec![3, 0, 2]),
        Err(SyncError::InvalidTaskSpace(_))
    ));
}

#[test]
fn test_box_rejects_inverted_or_equal_bounds() {
    let err = TaskSpace::boxed(vec![2], vec![0.0, 1.0], vec![1.0, 1.0]);
    assert!(matches!(err, Err(SyncError::InvalidTaskSpace(_))));

    let err = TaskSpace::boxed(vec![1], vec![2.0], vec![-1.0]);
    assert!(matches!(err, Err(SyncError::InvalidTaskSpace(_))));
}

#[test]
fn test_box_rejects_shape_mismatch_and_non_finite() {
    assert!(TaskSpace::boxed(vec![2, 2], vec![0.0; 3], vec![1.0; 3]).is_err());
    assert!(TaskSpace::boxed(vec![1], vec![f32::NEG_INFINITY], vec![1.0]).is_err());
    assert!(TaskSpace::boxed(vec![], vec![], vec![]).is_err());
}

#[test]
fn test_box_rejects_overflowing_shape() {
    let err = TaskSpace::boxed(vec![usize::MAX, 2], vec![0.0], vec![1.0]);
    assert!(matches!(err, Err(SyncError::InvalidTaskSpace(_))));

    // wraps to a small product in release builds if unchecked
    let wrapping = vec![(1usize << (usize::BITS - 1)) + 1, 2];
    let err = TaskSpace::boxed(wrapping.clone(), vec![0.0; 2], vec![1.0; 2]);
    assert!(matches!(err, Err(SyncError::InvalidTaskSpace(_))));

    let err = TaskSpace::boxed_uniform(wrapping, 0.0, 1.0);
    assert!(matches!(err, Err(SyncError::InvalidTaskSpace(_))));
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[test]
fn test_discrete_contains() {
    let space = TaskSpace::discrete(3).unwrap();
    assert!(space.contains(&Task::Discrete(0)));
    assert!(space.contains(&Task::Discrete(2)));
    assert!(!space.contains(&Task::Discrete(3)));
    assert!(!space.contains(&Task::MultiDiscrete(vec![0])));
}

#[test]
fn test_multi_discrete_contains_checks_length() {
    let space = TaskSpace::multi_discrete(vec![2, 3]).unwrap();
    assert!(space.contains(&Task::MultiDiscrete(vec![1, 2])));
    assert!(!space.contains(&Task::MultiDiscrete(vec![1, 3])));
    assert!(!space.contains(&Task::MultiDiscrete(vec![1])));
}

#[test]
fn test_box_contains_inclusive_bounds_and_rejects_nan() {
    let space = TaskSpace::boxed(vec![2], vec![-1.0, 0.0], vec![1.0, 5.0]).unwrap();
    assert!(space.contains(&Task::Box(vec![-1.0, 5.0])));
    assert!(!space.contains(&Task::Box(vec![-1.1, 0.0])));
    assert!(!space.contains(&Task::Box(vec![f32::NAN, 0.0])));
    assert!(!space.contains(&Task::Box(vec![0.0])));
}

#[test]
fn test_validate_reports_task_and_space() {
    let space = TaskSpace::discrete(2).unwrap();
    match space.validate(&Task::Discrete(7)) {
        Err(SyncError::TaskValidation { task, space }) => {
            assert_eq!(task, "7");
            assert_eq!(space, "Discrete(2)");
        }
        other => panic!("expected TaskValidation, got {:?}", other),
    }
}

// =============================================================================
// ENUMERATION
// =============================================================================

#[test]
fn test_multi_discrete_enumeration_order() {
    let space = TaskSpace::multi_discrete(vec![2, 3]).unwrap();
    assert_eq!(space.num_tasks(), Some(6));

    let tasks = space.tasks().unwrap();
    assert_eq!(tasks[0], Task::MultiDiscrete(vec![0, 0]));
    assert_eq!(tasks[1], Task::MultiDiscrete(vec![0, 1]));
    assert_eq!(tasks[3], Task::MultiDiscrete(vec![1, 0]));
    assert_eq!(tasks[5], Task::MultiDiscrete(vec![1, 2]));

    for (i, task) in tasks.iter().enumerate() {
        assert_eq!(space.task_index(task), Some(i as u64));
    }
    assert_eq!(space.task_at(6), None);
}

#[test]
fn test_box_is_not_enumerable() {
    let space = TaskSpace::boxed_uniform(vec![3], 0.0, 1.0).unwrap();
    assert!(!space.is_enumerable());
    assert_eq!(space.num_tasks(), None);
    assert!(matches!(space.tasks(), Err(SyncError::InvalidTaskSpace(_))));
    assert_eq!(space.task_index(&Task::Box(vec![0.5; 3])), None);
}

#[test]
fn test_num_tasks_overflow_is_none() {
    let space = TaskSpace::multi_discrete(vec![u64::MAX, 2]).unwrap();
    assert_eq!(space.num_tasks(), None);
}

// =============================================================================
// CODEC
// =============================================================================

#[test]
fn test_encode_rejects_foreign_task() {
    let space = TaskSpace::discrete(4).unwrap();
    assert!(matches!(
        space.encode(&Task::Discrete(4)),
        Err(SyncError::TaskValidation { .. })
    ));
}

#[test]
fn test_decode_rejects_task_from_other_space() {
    let big = TaskSpace::discrete(10).unwrap();
    let small = TaskSpace::discrete(3).unwrap();
    let bytes = big.encode(&Task::Discrete(8)).unwrap();
    assert!(matches!(
        small.decode(&bytes),
        Err(SyncError::TaskValidation { .. })
    ));
}

#[test]
fn test_decode_garbage_is_codec_error() {
    let space = TaskSpace::discrete(3).unwrap();
    assert!(matches!(
        space.decode(&[0xc1, 0xff, 0x00]),
        Err(SyncError::Codec(_))
    ));
}

#[test]
fn test_box_encoding_is_compact() {
    let space = TaskSpace::boxed_uniform(vec![4], 0.0, 1.0).unwrap();
    let task = space.sample();
    let bytes = space.encode(&task).unwrap();
    // four f32 payloads plus a few bytes of framing
    assert!(bytes.len() < 40, "encoded {} bytes", bytes.len());
}

// =============================================================================
// PROPERTIES
// =============================================================================

#[cfg(test)]
mod proptest_task_space {
    use super::*;
    use proptest::prelude::*;

    fn arb_space() -> impl Strategy<Value = TaskSpace> {
        prop_oneof![
            (1u64..1000).prop_map(|n| TaskSpace::discrete(n).unwrap()),
            prop::collection::vec(1u64..20, 1..5)
                .prop_map(|nvec| TaskSpace::multi_discrete(nvec).unwrap()),
            prop::collection::vec((-100.0f32..100.0, 0.001f32..50.0), 1..6).prop_map(|dims| {
                let low: Vec<f32> = dims.iter().map(|(lo, _)| *lo).collect();
                let high: Vec<f32> = dims.iter().map(|(lo, w)| lo + w).collect();
                TaskSpace::boxed(vec![low.len()], low, high).unwrap()
            }),
        ]
    }

    proptest! {
        /// Property: every sampled task is a member of its space
        #[test]
        fn test_sample_is_contained(space in arb_space(), seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            for _ in 0..16 {
                let task = space.sample_with(&mut rng);
                prop_assert!(space.contains(&task), "{} not in {}", task, space);
            }
        }

        /// Property: bounds spanning most of the f32 range still sample
        /// across the interval instead of collapsing onto `high`
        #[test]
        fn test_wide_box_sampling_spreads(
            scale in 0.5f32..1.0,
            seed in any::<u64>(),
        ) {
            let bound = f32::MAX * scale;
            let space = TaskSpace::boxed(vec![1], vec![-bound], vec![bound]).unwrap();
            let mut rng = fastrand::Rng::with_seed(seed);
            let mut at_high = 0;
            let mut negative = 0;
            for _ in 0..200 {
                let task = space.sample_with(&mut rng);
                prop_assert!(space.contains(&task));
                if let Task::Box(v) = &task {
                    if v[0] == bound {
                        at_high += 1;
                    }
                    if v[0] < 0.0 {
                        negative += 1;
                    }
                }
            }
            prop_assert!(at_high < 5, "{} of 200 samples hit high", at_high);
            prop_assert!(negative > 20 && negative < 180, "{} negative samples", negative);
        }

        /// Property: decode(encode(t)) reproduces t
        #[test]
        fn test_encode_decode_round_trip(space in arb_space(), seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let task = space.sample_with(&mut rng);
            let bytes = space.encode(&task).unwrap();
            let decoded = space.decode(&bytes).unwrap();
            match (&task, &decoded) {
                (Task::Box(a), Task::Box(b)) => {
                    prop_assert_eq!(a.len(), b.len());
                    for (x, y) in a.iter().zip(b.iter()) {
                        prop_assert!((x - y).abs() <= 1e-6);
                    }
                }
                _ => prop_assert_eq!(&task, &decoded),
            }
        }

        /// Property: enumeration index and task_at are inverse
        #[test]
        fn test_index_round_trip(nvec in prop::collection::vec(1u64..8, 1..4), pick in any::<u64>()) {
            let space = TaskSpace::multi_discrete(nvec).unwrap();
            let n = space.num_tasks().unwrap();
            let index = pick % n;
            let task = space.task_at(index).unwrap();
            prop_assert!(space.contains(&task));
            prop_assert_eq!(space.task_index(&task), Some(index));
        }
    }
}
