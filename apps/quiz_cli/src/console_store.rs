use answer_sync::AnswerStore;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{FieldId, StudentId},
    protocol::QuizResponse,
};
use tracing::info;

/// Logs each submitted answer instead of sending it anywhere.
pub struct ConsoleStore {
    student_id: StudentId,
    reject_saves: bool,
}

impl ConsoleStore {
    pub fn new(student_id: StudentId, reject_saves: bool) -> Self {
        Self {
            student_id,
            reject_saves,
        }
    }

    pub fn response_for(&self, field_id: &FieldId, value: &str) -> QuizResponse {
        QuizResponse {
            student_id: self.student_id.clone(),
            question_id: field_id.clone(),
            answer: value.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl AnswerStore for ConsoleStore {
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()> {
        if self.reject_saves {
            return Err(anyhow!("console store is configured to reject saves"));
        }
        let payload = serde_json::to_string(&self.response_for(field_id, value))?;
        info!(%payload, "store: saving answer");
        Ok(())
    }
}
