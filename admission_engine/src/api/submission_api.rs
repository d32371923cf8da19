use std::fmt::Debug;

use futures_util::future::join_all;
use log::*;
use rand::{thread_rng, Rng};
use regex::Regex;

use crate::{
    api::{
        errors::AdmissionError,
        submission_objects::{SubmissionDetail, SubmissionForm, UploadedDocument},
    },
    db_types::{NewSubmission, Progress, Submission},
    traits::{AdmissionManagement, CatalogLookup, DocumentStorage, StoreError},
};

const NISN_PATTERN: &str = r"^\d{10}$";
const PHONE_PATTERN: &str = r"^\+?\d{8,15}$";

/// `SubmissionApi` accepts admission forms, stores the uploaded documents and opens the application.
pub struct SubmissionApi<B, S> {
    db: B,
    storage: S,
}

impl<B, S> Debug for SubmissionApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubmissionApi")
    }
}

impl<B, S> SubmissionApi<B, S> {
    pub fn new(db: B, storage: S) -> Self {
        Self { db, storage }
    }
}

impl<B, S> SubmissionApi<B, S>
where
    B: AdmissionManagement + CatalogLookup,
    S: DocumentStorage,
{
    /// Stores the applicant's form and opens their application at the school in the `Submitted` stage.
    ///
    /// The three documents are uploaded concurrently before anything is written to the database, under names that
    /// are unique to this submission. If any upload or the insert fails, the documents uploaded by this call are
    /// deleted again and nothing is persisted.
    pub async fn submit(&self, user_id: i64, form: SubmissionForm) -> Result<(Submission, Progress), AdmissionError> {
        validate_form(&form)?;
        if self.db.fetch_school(form.school_id).await?.is_none() {
            return Err(AdmissionError::NotFound(format!("School #{}", form.school_id)));
        }
        self.ensure_no_application_in_progress(user_id, form.school_id).await?;
        let student_address = serde_json::to_string(&form.student_address)
            .map_err(|e| AdmissionError::Internal(format!("Could not serialize the student address. {e}")))?;
        let parent_address = serde_json::to_string(&form.parent_address)
            .map_err(|e| AdmissionError::Internal(format!("Could not serialize the parent address. {e}")))?;
        let [student_photo, student_signature, parent_signature] = self
            .upload_documents(user_id, form.school_id, [
                ("Student", form.student_photo),
                ("StudentSign", form.student_signature),
                ("ParentSign", form.parent_signature),
            ])
            .await?;
        let submission = NewSubmission {
            user_id,
            school_id: form.school_id,
            student_name: form.student_name,
            student_photo,
            student_signature,
            place_date: form.place_date,
            gender: form.gender,
            religion: form.religion,
            graduation_from: form.graduation_from,
            nisn: form.nisn,
            student_address,
            parent_name: form.parent_name,
            parent_job: form.parent_job,
            parent_religion: form.parent_religion,
            parent_phone: form.parent_phone,
            parent_signature,
            parent_address,
            submitted_on: form.submitted_on,
        };
        let documents = [
            submission.student_photo.clone(),
            submission.student_signature.clone(),
            submission.parent_signature.clone(),
        ];
        match self.db.insert_submission(submission).await {
            Ok((submission, progress)) => {
                info!(
                    "🔄️📝️ Submission #{} from user {user_id} stored. Progress #{} opened at school {}",
                    submission.id, progress.id, submission.school_id
                );
                Ok((submission, progress))
            },
            Err(e) => {
                warn!("🔄️📝️ Could not store the submission from user {user_id}. {e}");
                self.discard(&documents).await;
                Err(e.into())
            },
        }
    }

    pub async fn submission_by_id(&self, id: i64) -> Result<SubmissionDetail, AdmissionError> {
        let submission =
            self.db.fetch_submission(id).await?.ok_or_else(|| AdmissionError::NotFound(format!("Submission #{id}")))?;
        SubmissionDetail::try_from_submission(submission).map_err(|e| {
            error!("🔄️📝️ Submission #{id} has a corrupt address block. {e}");
            AdmissionError::Internal(format!("Submission #{id} could not be decoded"))
        })
    }

    /// Checked before uploading, so that a duplicate application cannot overwrite the documents of the one in
    /// progress. The store enforces the same rule when the submission is written.
    async fn ensure_no_application_in_progress(&self, user_id: i64, school_id: i64) -> Result<(), AdmissionError> {
        let progresses = self.db.fetch_progresses_for_user(user_id).await?;
        if progresses.iter().any(|p| p.school_id == school_id && !p.status.is_terminal()) {
            return Err(StoreError::ApplicationInProgress { user_id, school_id }.into());
        }
        Ok(())
    }

    async fn upload_documents(
        &self,
        user_id: i64,
        school_id: i64,
        documents: [(&str, UploadedDocument); 3],
    ) -> Result<[String; 3], AdmissionError> {
        let batch = upload_batch();
        let names =
            documents.each_ref().map(|(prefix, doc)| object_name(prefix, user_id, school_id, &batch, &doc.file_name));
        let uploads = documents
            .into_iter()
            .zip(names.iter())
            .map(|((_, doc), name)| async move { self.storage.upload(name, doc.content).await });
        let results = join_all(uploads).await;
        if results.iter().all(Result::is_ok) {
            debug!("🔄️📝️ Documents for user {user_id} uploaded: {}", names.join(", "));
            return Ok(names);
        }
        let uploaded = names
            .iter()
            .zip(results.iter())
            .filter_map(|(name, r)| r.is_ok().then(|| name.clone()))
            .collect::<Vec<_>>();
        let failures = results.into_iter().filter_map(Result::err).map(|e| e.to_string()).collect::<Vec<_>>();
        error!("🔄️📝️ Document upload for user {user_id} failed. {}", failures.join("; "));
        self.discard(&uploaded).await;
        Err(AdmissionError::Internal(format!("Document upload failed. {}", failures.join("; "))))
    }

    /// Best-effort removal of uploaded documents that will not be referenced by any submission.
    async fn discard(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.storage.delete(name).await {
                warn!("🔄️📝️ Orphaned document {name} could not be removed. {e}");
            }
        }
    }
}

/// `{prefix}_{user}_{school}_{batch}_{file}`, keeping only the final path component of the file name.
///
/// `batch` is shared by the documents of one submission and differs between submissions, so a new submission never
/// overwrites (or cleans up) the documents of an earlier one.
pub fn object_name(prefix: &str, user_id: i64, school_id: i64, batch: &str, file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim().replace(char::is_whitespace, "_");
    format!("{prefix}_{user_id}_{school_id}_{batch}_{base}")
}

fn upload_batch() -> String {
    format!("{:08x}", thread_rng().gen::<u32>())
}

fn validate_form(form: &SubmissionForm) -> Result<(), AdmissionError> {
    let required = [
        ("student_name", &form.student_name),
        ("place_date", &form.place_date),
        ("gender", &form.gender),
        ("religion", &form.religion),
        ("nisn", &form.nisn),
        ("parent_name", &form.parent_name),
        ("parent_phone", &form.parent_phone),
        ("submitted_on", &form.submitted_on),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(AdmissionError::validation(format!("Missing or Invalid Request Body. {field} is required")));
    }
    if form.school_id <= 0 {
        return Err(AdmissionError::validation("Missing or Invalid Request Body. school_id is required"));
    }
    if !matches_pattern(NISN_PATTERN, &form.nisn) {
        return Err(AdmissionError::validation("Missing or Invalid Request Body. nisn must be 10 digits"));
    }
    if !matches_pattern(PHONE_PATTERN, &form.parent_phone) {
        return Err(AdmissionError::validation("Missing or Invalid Request Body. parent_phone is not a phone number"));
    }
    let documents = [
        ("student_photo", &form.student_photo),
        ("student_signature", &form.student_signature),
        ("parent_signature", &form.parent_signature),
    ];
    if let Some((field, _)) = documents.iter().find(|(_, d)| d.file_name.trim().is_empty() || d.content.is_empty()) {
        return Err(AdmissionError::validation(format!("Missing or Invalid Request Body. {field} is required")));
    }
    Ok(())
}

fn matches_pattern(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(value.trim())).unwrap_or(false)
}
