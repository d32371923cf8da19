use std::fmt::Display;

use actix_web::http::StatusCode;
use admission_engine::{
    api::submission_objects::{SubmissionForm, UploadedDocument},
    db_types::{Address, Progress, ProgressStatus},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// The envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> WebResponse<T> {
    pub fn success<S: Display>(status: StatusCode, message: S, data: T) -> Self {
        Self { code: status.as_u16(), message: message.to_string(), data: Some(data) }
    }

    pub fn failure<S: Display>(status: StatusCode, message: S) -> Self {
        Self { code: status.as_u16(), message: message.to_string(), data: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressIdResponse {
    pub progress_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub id: i64,
    pub school_id: i64,
    pub status: ProgressStatus,
}

impl From<Progress> for ProgressView {
    fn from(p: Progress) -> Self {
        Self { id: p.id, school_id: p.school_id, status: p.status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionCreated {
    pub submission_id: i64,
    pub progress_id: i64,
}

/// An uploaded file, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedDocument {
    pub file_name: String,
    pub content: String,
}

impl EncodedDocument {
    fn decode(self, field: &str) -> Result<UploadedDocument, ServerError> {
        let content = base64::decode(self.content.trim())
            .map_err(|e| ServerError::InvalidRequestBody(format!("{field} is not valid base64. {e}")))?;
        Ok(UploadedDocument::new(self.file_name, content))
    }
}

/// `POST /submissions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub school_id: i64,
    pub student_name: String,
    pub place_date: String,
    pub gender: String,
    pub religion: String,
    #[serde(default)]
    pub graduation_from: String,
    pub nisn: String,
    #[serde(default)]
    pub student_address: Address,
    pub parent_name: String,
    #[serde(default)]
    pub parent_job: String,
    #[serde(default)]
    pub parent_religion: String,
    pub parent_phone: String,
    #[serde(default)]
    pub parent_address: Address,
    pub submitted_on: String,
    pub student_photo: EncodedDocument,
    pub student_signature: EncodedDocument,
    pub parent_signature: EncodedDocument,
}

impl TryFrom<SubmissionRequest> for SubmissionForm {
    type Error = ServerError;

    fn try_from(req: SubmissionRequest) -> Result<Self, Self::Error> {
        Ok(SubmissionForm {
            school_id: req.school_id,
            student_name: req.student_name,
            place_date: req.place_date,
            gender: req.gender,
            religion: req.religion,
            graduation_from: req.graduation_from,
            nisn: req.nisn,
            student_address: req.student_address,
            parent_name: req.parent_name,
            parent_job: req.parent_job,
            parent_religion: req.parent_religion,
            parent_phone: req.parent_phone,
            parent_address: req.parent_address,
            submitted_on: req.submitted_on,
            student_photo: req.student_photo.decode("student_photo")?,
            student_signature: req.student_signature.decode("student_signature")?,
            parent_signature: req.parent_signature.decode("parent_signature")?,
        })
    }
}
