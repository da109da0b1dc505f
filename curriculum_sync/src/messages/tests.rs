//! Tests for the message protocol.
//!
//! - `envelope_tests`: kinds, wire form
//! - `update_tests`: batches, completion signals, on-demand metrics
//! - `thread_safety_tests`: Send/Sync bounds

use super::*;
use crate::core::Task;

fn record(step: u64, reward: f32, done: bool) -> StepRecord {
    StepRecord {
        task: Task::Discrete(1),
        step,
        reward,
        terminated: done,
        truncated: false,
    }
}

mod envelope_tests {
    use super::*;

    #[test]
    fn test_kind_follows_payload() {
        let cases = vec![
            (Payload::TaskRequest, MessageKind::TaskRequest),
            (Payload::Heartbeat, MessageKind::Heartbeat),
            (Payload::Shutdown, MessageKind::Shutdown),
            (
                Payload::StepBatch(StepBatch::default()),
                MessageKind::StepBatch,
            ),
            (
                Payload::OnDemandUpdate(OnDemandUpdate::new()),
                MessageKind::OnDemandUpdate,
            ),
        ];
        for (payload, kind) in cases {
            assert_eq!(Message::new(3, 9, payload).kind(), kind);
        }
    }

    #[test]
    fn test_wire_form_preserves_envelope() {
        let msg = Message::new(
            7,
            42,
            Payload::TaskResponse(TaskAssignment {
                task: Task::MultiDiscrete(vec![1, 0, 2]),
                sample_id: 11,
                request_seq: 41,
            }),
        );
        let bytes = msg.to_bytes().unwrap();
        let back = Message::from_bytes(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_wire_form_rejects_truncated_input() {
        let msg = Message::new(1, 1, Payload::StepBatch(StepBatch::new(vec![record(0, 1.0, false)])));
        let bytes = msg.to_bytes().unwrap();
        assert!(Message::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::CompletionUpdate.to_string(), "CompletionUpdate");
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn test_step_batch_totals_skip_non_finite() {
        let batch = StepBatch::new(vec![
            record(0, 1.0, false),
            record(1, f32::NAN, false),
            record(2, 2.5, true),
        ]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.total_reward(), 3.5);
        assert_eq!(batch.episodes_ended(), 1);
    }

    #[test]
    fn test_completion_signal_values() {
        assert_eq!(CompletionSignal::Success(true).value(), 1.0);
        assert_eq!(CompletionSignal::Success(false).value(), 0.0);
        assert_eq!(CompletionSignal::Progress(0.25).value(), 0.25);
    }

    #[test]
    fn test_completion_signal_validity() {
        assert!(CompletionSignal::Progress(0.0).is_valid());
        assert!(CompletionSignal::Progress(1.0).is_valid());
        assert!(!CompletionSignal::Progress(1.5).is_valid());
        assert!(!CompletionSignal::Progress(-0.1).is_valid());
        assert!(!CompletionSignal::Progress(f32::NAN).is_valid());
    }

    #[test]
    fn test_on_demand_metrics() {
        let update = OnDemandUpdate::new()
            .with_metric("grad_norm", 0.5)
            .with_metric("grad_norm", 0.75)
            .with_metric("loss", 2.0);
        assert_eq!(update.metrics.len(), 2);
        assert_eq!(update.get("grad_norm"), Some(0.75));
        assert_eq!(update.get("missing"), None);
    }
}

mod thread_safety_tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_messages_are_send_sync() {
        assert_send_sync::<Message>();
        assert_send_sync::<Payload>();
        assert_send_sync::<StepBatch>();
        assert_send_sync::<OnDemandUpdate>();
    }

    #[test]
    fn test_message_crosses_threads() {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            tx.send(Message::new(5, 1, Payload::TaskRequest)).unwrap();
        });
        let msg = rx.recv().unwrap();
        assert_eq!(msg.env_id, 5);
        assert_eq!(msg.kind(), MessageKind::TaskRequest);
    }
}
