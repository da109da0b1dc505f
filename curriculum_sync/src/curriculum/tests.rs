//! Curriculum tests.

use super::*;
use crate::messages::StepRecord;

// ============================================================================
// Trait Defaults
// ============================================================================

mod trait_defaults {
    use super::*;

    /// Minimal curriculum that only implements the required methods.
    struct Fixed {
        space: Option<TaskSpace>,
    }

    impl Curriculum for Fixed {
        fn task_space(&self) -> Option<&TaskSpace> {
            self.space.as_ref()
        }

        fn sample(&mut self, _env_id: EnvId) -> Result<Task> {
            Ok(Task::Discrete(1))
        }
    }

    #[test]
    fn test_bound_space_missing_is_uninitialized() {
        let c = Fixed { space: None };
        assert_eq!(c.bound_space(), Err(SyncError::UninitializedCurriculum));
    }

    #[test]
    fn test_sample_many_repeats_sample() {
        let mut c = Fixed {
            space: Some(TaskSpace::discrete(2).unwrap()),
        };
        let tasks = c.sample_many(0, 3).unwrap();
        assert_eq!(tasks, vec![Task::Discrete(1); 3]);
        assert!(c.sample_many(0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_default_hooks_are_noops() {
        let mut c = Fixed { space: None };
        assert!(!c.wants_step_updates());
        assert_eq!(c.name(), "curriculum");
        c.on_step(0, &StepBatch::default());
        c.complete_task(0, &Task::Discrete(0), CompletionSignal::Success(true));
        c.on_demand(&OnDemandUpdate::new());
    }

    #[test]
    fn test_boxed_curriculum_delegates() {
        let mut c: Box<dyn Curriculum> =
            Box::new(SequentialCurriculum::new(TaskSpace::discrete(2).unwrap()).unwrap());
        assert_eq!(c.name(), "sequential");
        assert!(c.wants_step_updates());
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(0));
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(1));
    }
}

// ============================================================================
// UniformCurriculum
// ============================================================================

mod uniform_tests {
    use super::*;

    #[test]
    fn test_unbound_sample_fails() {
        let mut c = UniformCurriculum::unbound();
        assert_eq!(c.sample(0), Err(SyncError::UninitializedCurriculum));
        assert_eq!(c.samples_served(), 0);
    }

    #[test]
    fn test_bind_then_sample() {
        let mut c = UniformCurriculum::unbound();
        let space = TaskSpace::multi_discrete(vec![2, 3]).unwrap();
        c.bind(space.clone());
        for _ in 0..50 {
            assert!(space.contains(&c.sample(0).unwrap()));
        }
        assert_eq!(c.samples_served(), 50);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let space = TaskSpace::discrete(100).unwrap();
        let mut a = UniformCurriculum::new(space.clone()).with_seed(7);
        let mut b = UniformCurriculum::new(space).with_seed(7);
        let xs: Vec<Task> = (0..20).map(|_| a.sample(0).unwrap()).collect();
        let ys: Vec<Task> = (0..20).map(|_| b.sample(0).unwrap()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_uniform_covers_all_tasks() {
        let mut c = UniformCurriculum::new(TaskSpace::discrete(4).unwrap()).with_seed(1);
        let mut seen = [false; 4];
        for _ in 0..400 {
            let i = c.sample(0).unwrap().as_discrete().unwrap() as usize;
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_completions_counted_per_task() {
        let mut c = UniformCurriculum::new(TaskSpace::discrete(3).unwrap());
        c.complete_task(0, &Task::Discrete(2), CompletionSignal::Success(true));
        c.complete_task(1, &Task::Discrete(2), CompletionSignal::Success(false));
        c.complete_task(1, &Task::Discrete(0), CompletionSignal::Progress(0.5));

        assert_eq!(c.completions(), 3);
        assert_eq!(c.completions_for(2), 2);
        assert_eq!(c.completions_for(0), 1);
        assert_eq!(c.completions_for(1), 0);
        assert!((c.mean_completion() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_box_space_completion_counts_total_only() {
        let space = TaskSpace::boxed_uniform(vec![2], 0.0, 1.0).unwrap();
        let mut c = UniformCurriculum::new(space);
        c.complete_task(
            0,
            &Task::Box(vec![0.5, 0.5]),
            CompletionSignal::Success(true),
        );
        assert_eq!(c.completions(), 1);
        assert_eq!(c.completions_for(0), 0);
    }
}

// ============================================================================
// SequentialCurriculum
// ============================================================================

mod sequential_tests {
    use super::*;

    #[test]
    fn test_cycles_in_order() {
        let mut c = SequentialCurriculum::new(TaskSpace::discrete(3).unwrap()).unwrap();
        let got: Vec<u64> = (0..7)
            .map(|_| c.sample(0).unwrap().as_discrete().unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(c.samples_served(), 7);
    }

    #[test]
    fn test_cursor_shared_across_envs() {
        let mut c = SequentialCurriculum::new(TaskSpace::discrete(3).unwrap()).unwrap();
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(0));
        assert_eq!(c.sample(1).unwrap(), Task::Discrete(1));
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(2));
    }

    #[test]
    fn test_multi_discrete_enumeration_order() {
        let mut c = SequentialCurriculum::new(TaskSpace::multi_discrete(vec![2, 2]).unwrap())
            .unwrap();
        let got: Vec<Task> = (0..4).map(|_| c.sample(0).unwrap()).collect();
        assert_eq!(
            got,
            vec![
                Task::MultiDiscrete(vec![0, 0]),
                Task::MultiDiscrete(vec![0, 1]),
                Task::MultiDiscrete(vec![1, 0]),
                Task::MultiDiscrete(vec![1, 1]),
            ]
        );
    }

    #[test]
    fn test_box_space_rejected() {
        let space = TaskSpace::boxed_uniform(vec![1], 0.0, 1.0).unwrap();
        assert!(matches!(
            SequentialCurriculum::new(space),
            Err(SyncError::InvalidTaskSpace(_))
        ));
    }

    #[test]
    fn test_huge_discrete_space_accepted() {
        let mut c = SequentialCurriculum::new(TaskSpace::discrete(u64::MAX).unwrap()).unwrap();
        assert_eq!(c.num_tasks(), u64::MAX);
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(0));
        assert_eq!(c.sample(0).unwrap(), Task::Discrete(1));

        c.complete_task(0, &Task::Discrete(u64::MAX - 1), CompletionSignal::Success(true));
        assert_eq!(c.completions_for(u64::MAX - 1), 1);
    }

    #[test]
    fn test_overflowing_multi_discrete_rejected() {
        let space = TaskSpace::multi_discrete(vec![u64::MAX, 2]).unwrap();
        assert!(matches!(
            SequentialCurriculum::new(space),
            Err(SyncError::InvalidTaskSpace(_))
        ));
    }

    #[test]
    fn test_records_every_update_kind() {
        let mut c = SequentialCurriculum::new(TaskSpace::discrete(2).unwrap()).unwrap();
        let record = StepRecord {
            task: Task::Discrete(1),
            step: 0,
            reward: 0.0,
            terminated: false,
            truncated: false,
        };
        c.on_step(0, &StepBatch::new(vec![record.clone(), record]));
        c.on_episode(
            0,
            &EpisodeUpdate {
                task: Task::Discrete(1),
                episode_return: 1.0,
                episode_length: 2,
            },
        );
        c.complete_task(0, &Task::Discrete(1), CompletionSignal::Success(true));
        c.complete_task(0, &Task::Discrete(9), CompletionSignal::Success(true));
        c.on_demand(&OnDemandUpdate::new().with_metric("loss", 1.0));

        assert_eq!(c.step_records(), 2);
        assert_eq!(c.episodes(), 1);
        assert_eq!(c.completions(), 2);
        assert_eq!(c.completions_for(0), 0);
        assert_eq!(c.completions_for(1), 1);
        assert_eq!(c.completions_for(9), 0);
        assert_eq!(c.on_demand_updates(), 1);
    }
}
