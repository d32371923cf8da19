use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Address, Submission};

/// A file uploaded with the admission form.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedDocument {
    pub fn new<S: Into<String>>(file_name: S, content: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content }
    }
}

impl std::fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UploadedDocument({}, {} bytes)", self.file_name, self.content.len())
    }
}

/// The admission form as the applicant filled it in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionForm {
    pub school_id: i64,
    pub student_name: String,
    pub place_date: String,
    pub gender: String,
    pub religion: String,
    pub graduation_from: String,
    pub nisn: String,
    pub student_address: Address,
    pub parent_name: String,
    pub parent_job: String,
    pub parent_religion: String,
    pub parent_phone: String,
    pub parent_address: Address,
    pub submitted_on: String,
    pub student_photo: UploadedDocument,
    pub student_signature: UploadedDocument,
    pub parent_signature: UploadedDocument,
}

/// A stored submission with its address blocks decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDetail {
    pub id: i64,
    pub user_id: i64,
    pub school_id: i64,
    pub student_name: String,
    pub student_photo: String,
    pub student_signature: String,
    pub place_date: String,
    pub gender: String,
    pub religion: String,
    pub graduation_from: String,
    pub nisn: String,
    pub student_address: Address,
    pub parent_name: String,
    pub parent_job: String,
    pub parent_religion: String,
    pub parent_phone: String,
    pub parent_signature: String,
    pub parent_address: Address,
    pub submitted_on: String,
    pub created_at: DateTime<Utc>,
}

impl SubmissionDetail {
    /// Fails if either address block is not valid JSON.
    pub fn try_from_submission(s: Submission) -> Result<Self, serde_json::Error> {
        let student_address = serde_json::from_str(&s.student_address)?;
        let parent_address = serde_json::from_str(&s.parent_address)?;
        Ok(Self {
            id: s.id,
            user_id: s.user_id,
            school_id: s.school_id,
            student_name: s.student_name,
            student_photo: s.student_photo,
            student_signature: s.student_signature,
            place_date: s.place_date,
            gender: s.gender,
            religion: s.religion,
            graduation_from: s.graduation_from,
            nisn: s.nisn,
            student_address,
            parent_name: s.parent_name,
            parent_job: s.parent_job,
            parent_religion: s.parent_religion,
            parent_phone: s.parent_phone,
            parent_signature: s.parent_signature,
            parent_address,
            submitted_on: s.submitted_on,
            created_at: s.created_at,
        })
    }
}
