use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        progress_api::ProgressCoordinator,
        transaction_api::TransactionProcessor,
        webhook_objects::{PaymentNotification, ReconciliationAction, ReconciliationReport},
    },
    db_types::{ProgressStatus, Rupiah, Transaction, TransactionStatus},
    events::{BrokerEvent, PaymentResultMessage, PushNotification, Topic},
    notifications::NotificationFanout,
    traits::{AdmissionManagement, CatalogLookup, PaymentGateway, PushNotifier, TransactionManagement},
};

/// `WebhookReconciler` applies payment provider notifications to transactions, and cascades the result to the
/// applicant's cart and admission progress.
///
/// Nothing in here returns an error. Every failed step is logged, recorded on the [`ReconciliationReport`] and the
/// remaining steps carry on where that makes sense.
///
/// Notifications are idempotent. A settlement that arrives again for a transaction that is already paid re-runs the
/// cart and progress steps (which are no-ops once they have succeeded) but does not notify the applicant a second
/// time.
pub struct WebhookReconciler<B, G, P> {
    transactions: TransactionProcessor<B, G, P>,
    progress: ProgressCoordinator<B, P>,
    fanout: NotificationFanout<P>,
}

impl<B, G, P> Debug for WebhookReconciler<B, G, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookReconciler")
    }
}

impl<B, G, P> WebhookReconciler<B, G, P> {
    pub fn new(
        transactions: TransactionProcessor<B, G, P>,
        progress: ProgressCoordinator<B, P>,
        fanout: NotificationFanout<P>,
    ) -> Self {
        Self { transactions, progress, fanout }
    }
}

impl<B, G, P> WebhookReconciler<B, G, P>
where
    B: AdmissionManagement + TransactionManagement + CatalogLookup,
    G: PaymentGateway,
    P: PushNotifier,
{
    pub async fn handle(&self, notification: PaymentNotification) -> ReconciliationReport {
        let invoice = notification.invoice();
        debug!(
            "🔔️ Payment notification for {invoice}: {} ({}, fraud status '{}', {} at {})",
            notification.transaction_status,
            notification.payment_type,
            notification.fraud_status,
            notification.gross_amount,
            notification.transaction_time
        );
        if !self.transactions.gateway().verify_notification(&notification) {
            warn!("🔔️ Payment notification for {invoice} has an invalid signature. Ignoring it.");
            return ReconciliationReport::new(invoice, ReconciliationAction::Rejected("Invalid signature".into()));
        }
        let Some(target) = notification.target_status() else {
            debug!("🔔️ Nothing to do for '{}' on {invoice}", notification.transaction_status);
            let reason = format!("Status '{}' is informational", notification.transaction_status);
            return ReconciliationReport::new(invoice, ReconciliationAction::Ignored(reason));
        };
        let tx = match self.transactions.transaction(&invoice).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!("🔔️ Payment notification for unknown invoice {invoice}. {e}");
                return ReconciliationReport::new(invoice, ReconciliationAction::Rejected(e.to_string()));
            },
        };
        let replay = match tx.status {
            TransactionStatus::Pending => false,
            s if s == target => true,
            s => {
                warn!("🔔️ Transaction {invoice} is already {s}. Ignoring the '{target}' notification.");
                let reason = format!("Transaction is already {s}");
                return ReconciliationReport::new(invoice, ReconciliationAction::Ignored(reason));
            },
        };
        let action = match (target, replay) {
            (s, true) => ReconciliationAction::Replayed(s),
            (TransactionStatus::Cancel, false) => ReconciliationAction::Cancelled,
            _ => ReconciliationAction::Paid,
        };
        let mut report = ReconciliationReport::new(invoice, action);
        check_amount(&notification, &tx, &mut report);
        match target {
            TransactionStatus::Cancel => self.cancel(&tx, replay, &mut report).await,
            _ => self.settle(&tx, replay, &mut report).await,
        }
        if report.is_clean() {
            info!("🔔️ Payment notification processed. {report}");
        } else {
            warn!("🔔️ Payment notification processed with issues. {report}");
        }
        report
    }

    async fn settle(&self, tx: &Transaction, replay: bool, report: &mut ReconciliationReport) {
        let mut notify = !replay;
        if !replay {
            if let Err(e) = self.transactions.update_status(&tx.invoice, TransactionStatus::Paid).await {
                error!("🔔️ Could not mark {} as paid. {e}", tx.invoice);
                report.issue(format!("Transaction update failed. {e}"));
                notify = false;
            }
        }
        match self.transactions.cart(tx.user_id, tx.school_id).await {
            Ok(cart) => {
                let status = cart.cart_type.paid_status();
                if let Err(e) = self.progress.advance_by_participant(tx.user_id, tx.school_id, status).await {
                    error!("🔔️ Could not advance progress to '{status}' after paying {}. {e}", tx.invoice);
                    report.issue(format!("Progress update failed. {e}"));
                }
                self.close_cart(tx, report).await;
            },
            Err(e) => {
                warn!("🔔️ No cart to settle for {}. Progress is unchanged. {e}", tx.invoice);
                report.issue(format!("Cart lookup failed. {e}"));
            },
        }
        if notify {
            self.notify(tx, Topic::PaymentConfirmed, PushNotification::payment_success).await;
        }
    }

    /// The application only fails if the expiring transaction was backing the participant's open cart. A transaction
    /// that has nothing left to pay for (for example, one whose cart a settlement already closed) only cancels itself.
    async fn cancel(&self, tx: &Transaction, replay: bool, report: &mut ReconciliationReport) {
        let backing_cart = self.close_cart(tx, report).await;
        if replay {
            return;
        }
        if let Err(e) = self.transactions.update_status(&tx.invoice, TransactionStatus::Cancel).await {
            error!("🔔️ Could not cancel {}. {e}", tx.invoice);
            report.issue(format!("Transaction update failed. {e}"));
        }
        if backing_cart {
            if let Err(e) =
                self.progress.advance_by_participant(tx.user_id, tx.school_id, ProgressStatus::Failed).await
            {
                error!("🔔️ Could not fail the application after {} expired. {e}", tx.invoice);
                report.issue(format!("Progress update failed. {e}"));
            }
        } else {
            debug!("🔔️ {} was not backing an open cart. Progress is unchanged.", tx.invoice);
        }
        self.notify(tx, Topic::PaymentCancelled, PushNotification::payment_cancelled).await;
    }

    /// Returns `true` only if this call closed an open cart.
    async fn close_cart(&self, tx: &Transaction, report: &mut ReconciliationReport) -> bool {
        match self.transactions.close_cart(tx.user_id, tx.school_id).await {
            Ok(true) => {
                trace!("🔔️ Cart for {} closed", tx.invoice);
                true
            },
            Ok(false) => {
                debug!("🔔️ Cart for {} was already closed", tx.invoice);
                false
            },
            Err(e) => {
                error!("🔔️ Could not close the cart for {}. {e}", tx.invoice);
                report.issue(format!("Cart removal failed. {e}"));
                false
            },
        }
    }

    async fn notify(&self, tx: &Transaction, topic: Topic, push: fn(&str, &str) -> PushNotification) {
        let Some((user, school)) = self.progress.participants(tx.user_id, tx.school_id).await else {
            return;
        };
        let message = PaymentResultMessage { invoice: tx.invoice.clone(), email: user.email.clone(), name: user.full_name() };
        self.fanout.publish_detached(BrokerEvent::new(topic, &message));
        self.fanout.push(push(&user.username, &school.name)).await;
    }
}

fn check_amount(notification: &PaymentNotification, tx: &Transaction, report: &mut ReconciliationReport) {
    if notification.gross_amount.is_empty() {
        return;
    }
    match Rupiah::try_from(notification.gross_amount.as_str()) {
        Ok(amount) if amount == tx.total => {},
        Ok(amount) => {
            warn!("🔔️ Notification for {} reports {amount}, but the transaction total is {}", tx.invoice, tx.total);
            report.issue(format!("Amount mismatch: notified {amount}, expected {}", tx.total));
        },
        Err(e) => {
            warn!("🔔️ Notification for {} has an unreadable amount '{}'. {e}", tx.invoice, notification.gross_amount);
        },
    }
}
