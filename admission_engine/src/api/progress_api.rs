use std::fmt::Debug;

use log::*;

use crate::{
    api::errors::AdmissionError,
    db_types::{Progress, ProgressStatus, School, UserProfile},
    events::{BrokerEvent, PushNotification, TestLinkMessage, Topic},
    notifications::NotificationFanout,
    traits::{AdmissionManagement, CatalogLookup, PushNotifier},
};

/// `ProgressCoordinator` moves admission applications through their stages and runs the side effects attached to
/// each stage.
///
/// There is no transition graph: any admin-settable stage may follow any other, as long as the application has not
/// reached a terminal stage. Stages with side effects:
/// * `Send Detail Costs Registration` and `Send Detail Costs Her-Registration` open a cart of the matching type. The
///   store does this in the same database transaction as the status write.
/// * `File Approved` pushes an admission notification to the applicant.
/// * `Send Test Link` pushes an admission notification and publishes the test link on the broker.
pub struct ProgressCoordinator<B, P> {
    db: B,
    fanout: NotificationFanout<P>,
}

impl<B, P> Debug for ProgressCoordinator<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProgressCoordinator")
    }
}

impl<B, P> ProgressCoordinator<B, P> {
    pub fn new(db: B, fanout: NotificationFanout<P>) -> Self {
        Self { db, fanout }
    }
}

impl<B, P> ProgressCoordinator<B, P>
where
    B: AdmissionManagement + CatalogLookup,
    P: PushNotifier,
{
    /// Administrator-driven stage change. `target` must name one of the admin-settable stages.
    pub async fn advance(&self, progress_id: i64, target: &str) -> Result<Progress, AdmissionError> {
        let status = ProgressStatus::parse_admin_status(target).map_err(|e| {
            debug!("🔄️📋️ Rejected status change for progress #{progress_id}. {e}");
            AdmissionError::validation("Invalid Request Body. Status Not Available")
        })?;
        let progress = self.db.advance_progress(progress_id, status, status.cart_to_open()).await?;
        info!("🔄️📋️ Progress #{progress_id} is now at '{status}'");
        self.after_advance(&progress).await;
        Ok(progress)
    }

    /// Stage change for the participant's application in progress. Used by the payment flow, so the
    /// payment-driven stages are allowed here.
    pub async fn advance_by_participant(
        &self,
        user_id: i64,
        school_id: i64,
        status: ProgressStatus,
    ) -> Result<Progress, AdmissionError> {
        let progress =
            self.db.advance_progress_for_participant(user_id, school_id, status, status.cart_to_open()).await?;
        info!("🔄️📋️ Progress #{} for user {user_id} at school {school_id} is now at '{status}'", progress.id);
        self.after_advance(&progress).await;
        Ok(progress)
    }

    pub async fn progress(&self, progress_id: i64) -> Result<Progress, AdmissionError> {
        self.db
            .fetch_progress(progress_id)
            .await?
            .ok_or_else(|| AdmissionError::NotFound(format!("Progress #{progress_id}")))
    }

    pub async fn progresses_for_user(&self, user_id: i64) -> Result<Vec<Progress>, AdmissionError> {
        Ok(self.db.fetch_progresses_for_user(user_id).await?)
    }

    async fn after_advance(&self, progress: &Progress) {
        if !matches!(progress.status, ProgressStatus::FileApproved | ProgressStatus::SendTestLink) {
            return;
        }
        let Some((user, school)) = self.participants(progress.user_id, progress.school_id).await else {
            return;
        };
        self.fanout.push(PushNotification::admission(&user.username, &school.name, progress.status)).await;
        if progress.status == ProgressStatus::SendTestLink {
            let message = TestLinkMessage {
                email: user.email.clone(),
                name: user.full_name(),
                school: school.name.clone(),
                test: school.quiz_link_pub.clone().unwrap_or_default(),
            };
            if message.test.is_empty() {
                warn!("🔄️📋️ School #{} has no published test link. Sending the notification anyway.", school.id);
            }
            self.fanout.publish_detached(BrokerEvent::new(Topic::TestLink, &message));
        }
    }

    /// Looks up the applicant and school for notifications. Lookup failures are logged and yield `None`.
    pub(crate) async fn participants(&self, user_id: i64, school_id: i64) -> Option<(UserProfile, School)> {
        let user = match self.db.fetch_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("🔄️📋️ User #{user_id} does not exist. No notification sent.");
                return None;
            },
            Err(e) => {
                error!("🔄️📋️ Could not fetch user #{user_id} for notifications. {e}");
                return None;
            },
        };
        let school = match self.db.fetch_school(school_id).await {
            Ok(Some(school)) => school,
            Ok(None) => {
                warn!("🔄️📋️ School #{school_id} does not exist. No notification sent.");
                return None;
            },
            Err(e) => {
                error!("🔄️📋️ Could not fetch school #{school_id} for notifications. {e}");
                return None;
            },
        };
        Some((user, school))
    }
}
