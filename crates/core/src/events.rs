use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Pipeline states of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    ExtractingVision,
    ExtractingAudio,
    ExtractingContent,
    Fusing,
    Done,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ExtractingVision => "vision",
            Stage::ExtractingAudio => "audio",
            Stage::ExtractingContent => "content",
            Stage::Fusing => "fusion",
            Stage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Started,
    Completed,
    Degraded { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    pub analysis_id: Uuid,
    pub stage: Stage,
    pub status: StageStatus,
    pub timestamp: SystemTime,
}

impl StageEvent {
    pub fn event_type(&self) -> &'static str {
        match (self.stage, &self.status) {
            (_, StageStatus::Degraded { .. }) => "stage.degraded",
            (Stage::Done, _) => "analysis.completed",
            (_, StageStatus::Started) => "stage.started",
            (_, StageStatus::Completed) => "stage.completed",
        }
    }
}

/// Publishes stage transitions of one request to an optional observer.
#[derive(Clone)]
pub struct StageReporter {
    analysis_id: Uuid,
    sink: Option<mpsc::UnboundedSender<StageEvent>>,
}

impl StageReporter {
    pub fn new(analysis_id: Uuid, sink: Option<mpsc::UnboundedSender<StageEvent>>) -> Self {
        Self { analysis_id, sink }
    }

    pub fn analysis_id(&self) -> Uuid {
        self.analysis_id
    }

    pub fn publish(&self, stage: Stage, status: StageStatus) {
        let Some(sink) = &self.sink else {
            return;
        };
        // Observer went away; the analysis carries on without it
        let _ = sink.send(StageEvent {
            analysis_id: self.analysis_id,
            stage,
            status,
            timestamp: SystemTime::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_sink_is_a_no_op() {
        let reporter = StageReporter::new(Uuid::new_v4(), None);
        reporter.publish(Stage::Fusing, StageStatus::Started);
    }

    #[test]
    fn events_carry_the_analysis_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let reporter = StageReporter::new(id, Some(tx));

        reporter.publish(
            Stage::ExtractingAudio,
            StageStatus::Degraded {
                reason: "ffmpeg missing".into(),
            },
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.analysis_id, id);
        assert_eq!(event.stage, Stage::ExtractingAudio);
        assert_eq!(event.event_type(), "stage.degraded");
    }
}
