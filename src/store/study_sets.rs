//! Study sets and topic history on top of a [`DatabaseAdapter`]

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::database::{DatabaseAdapter, Filter, Record};
use super::error::StoreError;
use crate::error::Error;
use crate::generator::generate_quiz;
use crate::model::TextModel;
use crate::types::{Flashcard, GeneratedMaterials, Quiz, StudySet, Topic};

pub const STUDY_SETS: &str = "studySets";
pub const TOPICS: &str = "topics";

/// Fields of a study set that may be changed after creation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Data("expected a JSON object".to_string())),
    }
}

fn from_record<T: serde::de::DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Typed access to stored study sets and topics
#[derive(Clone)]
pub struct StudySetRepository<D> {
    db: D,
}

impl<D: DatabaseAdapter> StudySetRepository<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    /// Persist generated material for a user and return the new id
    #[instrument(skip(self, materials))]
    pub async fn create_study_set(
        &self,
        user_id: &str,
        topic: &str,
        materials: &GeneratedMaterials,
    ) -> Result<String, StoreError> {
        let record = to_record(&json!({
            "userId": user_id,
            "topic": topic,
            "summary": materials.summary,
            "flashcards": materials.flashcards,
            "quiz": materials.quiz,
        }))?;
        let id = self.db.create(STUDY_SETS, record).await?;
        info!(%id, "Study set saved");
        Ok(id)
    }

    pub async fn get_study_set(&self, id: &str) -> Result<Option<StudySet>, StoreError> {
        self.db
            .get_by_id(STUDY_SETS, id)
            .await?
            .map(from_record)
            .transpose()
    }

    /// A user's study sets, newest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<StudySet>, StoreError> {
        let records = self
            .db
            .query(STUDY_SETS, &[Filter::eq("userId", user_id)])
            .await?;
        let mut sets = records
            .into_iter()
            .map(from_record)
            .collect::<Result<Vec<StudySet>, _>>()?;
        sets.reverse();
        Ok(sets)
    }

    pub async fn update_study_set(&self, id: &str, patch: &StudySetPatch) -> Result<(), StoreError> {
        self.db.update(STUDY_SETS, id, to_record(patch)?).await
    }

    /// Swap the quiz of a study set, leaving everything else untouched
    pub async fn replace_quiz(&self, id: &str, quiz: &Quiz) -> Result<(), StoreError> {
        let patch = StudySetPatch {
            quiz: Some(quiz.clone()),
            ..Default::default()
        };
        self.update_study_set(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.db.delete(STUDY_SETS, id).await
    }

    /// Record a topic in the user's history
    pub async fn create_topic(
        &self,
        user_id: &str,
        name: &str,
        study_set_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut record = to_record(&json!({ "userId": user_id, "name": name }))?;
        if let Some(study_set_id) = study_set_id {
            record.insert("studySetId".to_string(), json!(study_set_id));
        }
        self.db.create(TOPICS, record).await
    }

    pub async fn topics_for_user(&self, user_id: &str) -> Result<Vec<Topic>, StoreError> {
        self.db
            .query(TOPICS, &[Filter::eq("userId", user_id)])
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Generate a new quiz from a stored summary and store it in place
    #[instrument(skip(self, model))]
    pub async fn regenerate_quiz<M: TextModel>(
        &self,
        model: &M,
        id: &str,
        count: usize,
    ) -> Result<Quiz, Error> {
        let study_set = self
            .get_study_set(id)
            .await?
            .ok_or_else(|| StoreError::not_found(STUDY_SETS, id))?;
        let quiz = generate_quiz(model, &study_set.summary, &study_set.topic, count).await?;
        self.replace_quiz(id, &quiz).await?;
        info!(questions = quiz.questions.len(), "Quiz regenerated");
        Ok(quiz)
    }
}
