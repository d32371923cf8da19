use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{
        errors::AdmissionError,
        transaction_objects::{
            CartSummary,
            CheckoutRequest,
            HerRegistrationQuote,
            RegistrationQuote,
            TransactionDetail,
            REGISTRATION_FEE,
            REGISTRATION_ITEM,
        },
    },
    db_types::{Cart, CartType, Invoice, NewTransaction, NewTransactionItem, Rupiah, Transaction, TransactionStatus},
    events::{BrokerEvent, CheckoutCreatedMessage, Topic},
    helpers::{compute_expiry, InvoiceGenerator, MAX_INVOICE_ATTEMPTS},
    notifications::NotificationFanout,
    traits::{CatalogLookup, ChargeRequest, PaymentGateway, StoreError, TransactionManagement},
};

/// `TransactionProcessor` turns open carts into gateway charges and keeps the transaction records that track them.
pub struct TransactionProcessor<B, G, P> {
    db: B,
    gateway: G,
    fanout: NotificationFanout<P>,
    invoices: InvoiceGenerator,
    expiry_grace: Duration,
}

impl<B, G, P> Debug for TransactionProcessor<B, G, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionProcessor (expiry grace {} min)", self.expiry_grace.num_minutes())
    }
}

impl<B, G, P> TransactionProcessor<B, G, P> {
    /// `expiry_grace` is added to the charge time when the gateway does not report an expiry of its own.
    pub fn new(db: B, gateway: G, fanout: NotificationFanout<P>, expiry_grace: Duration) -> Self {
        Self { db, gateway, fanout, invoices: InvoiceGenerator::new(), expiry_grace }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G, P> TransactionProcessor<B, G, P>
where
    B: TransactionManagement + CatalogLookup,
    G: PaymentGateway,
{
    /// Charges the applicant for their open cart at the school.
    ///
    /// * `registration` is a flat fee with a single line item.
    /// * `herregistration` has one line item per payment plan configured for the school.
    ///
    /// The requested type must match the participant's open cart, and they may not already have a pending
    /// transaction at the school. The transaction is reserved under a fresh invoice before the gateway is charged, and
    /// the reservation is deleted again if the charge fails. Nothing is charged or stored if the request is invalid.
    /// Once the charge is recorded, a "checkout created" message is queued for the broker without waiting for it.
    pub async fn checkout(&self, user_id: i64, request: CheckoutRequest) -> Result<Transaction, AdmissionError> {
        let cart_type = request.cart_type.parse::<CartType>().map_err(|e| {
            debug!("🔄️💳️ Rejected checkout for user {user_id}. {e}");
            AdmissionError::validation("Invalid Request Body. type must be registration or herregistration")
        })?;
        let payment_method = request.payment_method.trim().to_lowercase();
        if payment_method.is_empty() || request.school_id <= 0 {
            return Err(AdmissionError::validation("Missing or Invalid Request Body"));
        }
        let school_id = request.school_id;
        self.ensure_checkout_allowed(user_id, school_id, cart_type).await?;
        let items = self.line_items(school_id, cart_type).await?;
        let total = items.iter().map(|i| i.item_price).sum::<Rupiah>();
        let reservation = NewTransaction {
            invoice: Invoice::from(""),
            user_id,
            school_id,
            total,
            payment_code: String::new(),
            payment_method: payment_method.clone(),
            expire_at: compute_expiry(None, Utc::now().naive_utc(), self.expiry_grace),
            items: items.clone(),
        };
        let invoice = self.reserve_invoice(reservation).await?;
        trace!("🔄️💳️ Charging {total} for {invoice} ({cart_type}, {} items)", items.len());
        let charge = ChargeRequest { invoice: invoice.clone(), total, items, payment_method };
        let charge = match self.gateway.charge(charge).await {
            Ok(charge) => charge,
            Err(e) => {
                error!("🔄️💳️ Gateway charge for {invoice} failed. {e}");
                self.release_invoice(&invoice).await;
                return Err(e.into());
            },
        };
        let expire_at = compute_expiry(charge.expiry, charge.transaction_time, self.expiry_grace);
        let transaction = self.db.record_charge(&invoice, &charge.payment_code, expire_at).await.map_err(|e| {
            error!("🔄️💳️ {invoice} was charged, but the charge could not be recorded. {e}");
            AdmissionError::from(e)
        })?;
        info!("🔄️💳️ Checkout {} created for user {user_id} at school {school_id}: {total}", transaction.invoice);
        self.announce_checkout(&transaction).await;
        Ok(transaction)
    }

    /// The applicant's pending transaction at the school, or a quote for their open cart if they have not checked
    /// out yet.
    pub async fn detail(&self, school_id: i64, user_id: i64) -> Result<TransactionDetail, AdmissionError> {
        if let Some(tx) = self.db.fetch_pending_transaction(user_id, school_id).await? {
            return Ok(TransactionDetail::Active(tx.into()));
        }
        let cart = self.cart(user_id, school_id).await?;
        let detail = match cart.cart_type {
            CartType::Registration => TransactionDetail::Registration(RegistrationQuote::default()),
            CartType::HerRegistration => {
                let plans = self.db.fetch_school_payments(school_id).await?;
                TransactionDetail::HerRegistration(HerRegistrationQuote::from_plans(&plans))
            },
        };
        Ok(detail)
    }

    pub async fn carts_for_user(&self, user_id: i64) -> Result<Vec<CartSummary>, AdmissionError> {
        let carts = self.db.fetch_carts_for_user(user_id).await?;
        Ok(carts.into_iter().map(CartSummary::from).collect())
    }

    /// Settles a pending transaction. Only the payment notification flow should call this.
    pub async fn update_status(
        &self,
        invoice: &Invoice,
        status: TransactionStatus,
    ) -> Result<Transaction, AdmissionError> {
        if status == TransactionStatus::Pending {
            return Err(AdmissionError::validation("Transactions cannot be moved back to pending"));
        }
        let tx = self.db.settle_transaction(invoice, status).await?;
        debug!("🔄️💳️ Transaction {invoice} is now {status}");
        Ok(tx)
    }

    pub async fn transaction(&self, invoice: &Invoice) -> Result<Transaction, AdmissionError> {
        self.db.fetch_transaction(invoice).await?.ok_or_else(|| AdmissionError::NotFound(format!("Invoice {invoice}")))
    }

    pub async fn cart(&self, user_id: i64, school_id: i64) -> Result<Cart, AdmissionError> {
        self.db
            .fetch_cart(user_id, school_id)
            .await?
            .ok_or_else(|| AdmissionError::NotFound(format!("Cart for user {user_id} at school {school_id}")))
    }

    /// Closes the participant's open cart. Returns `false` if there was none to close.
    pub async fn close_cart(&self, user_id: i64, school_id: i64) -> Result<bool, AdmissionError> {
        Ok(self.db.close_cart(user_id, school_id).await?)
    }

    async fn line_items(&self, school_id: i64, cart_type: CartType) -> Result<Vec<NewTransactionItem>, AdmissionError> {
        match cart_type {
            CartType::Registration => Ok(vec![NewTransactionItem::new(REGISTRATION_ITEM, Rupiah::from(REGISTRATION_FEE))]),
            CartType::HerRegistration => {
                let plans = self.db.fetch_school_payments(school_id).await?;
                if plans.is_empty() {
                    return Err(AdmissionError::validation(format!(
                        "School {school_id} has no payment plans to check out"
                    )));
                }
                Ok(plans.into_iter().map(|p| NewTransactionItem::new(p.description, p.price)).collect())
            },
        }
    }

    async fn ensure_checkout_allowed(
        &self,
        user_id: i64,
        school_id: i64,
        cart_type: CartType,
    ) -> Result<(), AdmissionError> {
        match self.db.fetch_cart(user_id, school_id).await? {
            Some(cart) if cart.cart_type == cart_type => {},
            Some(cart) => {
                return Err(AdmissionError::validation(format!(
                    "The open cart for user {user_id} at school {school_id} is {}, not {cart_type}",
                    cart.cart_type
                )));
            },
            None => {
                return Err(AdmissionError::validation(format!(
                    "User {user_id} has no open {cart_type} cart at school {school_id}"
                )));
            },
        }
        if let Some(tx) = self.db.fetch_pending_transaction(user_id, school_id).await? {
            debug!("🔄️💳️ User {user_id} tried to check out again while {} is pending", tx.invoice);
            return Err(StoreError::PendingTransactionExists { user_id, school_id }.into());
        }
        Ok(())
    }

    /// Stores `reservation` under the first free invoice number.
    async fn reserve_invoice(&self, reservation: NewTransaction) -> Result<Invoice, AdmissionError> {
        let (user_id, school_id) = (reservation.user_id, reservation.school_id);
        for attempt in 1..=MAX_INVOICE_ATTEMPTS {
            let candidate = self.invoices.generate(school_id, user_id);
            let new_tx = NewTransaction { invoice: candidate.clone(), ..reservation.clone() };
            match self.db.insert_transaction(new_tx).await {
                Ok(tx) => return Ok(tx.invoice),
                Err(StoreError::InvoiceAlreadyExists(_)) => {
                    debug!("🔄️💳️ Invoice {candidate} is taken (attempt {attempt} of {MAX_INVOICE_ATTEMPTS})");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(AdmissionError::Internal(format!(
            "Could not find a free invoice number for user {user_id} at school {school_id}"
        )))
    }

    async fn release_invoice(&self, invoice: &Invoice) {
        match self.db.discard_transaction(invoice).await {
            Ok(true) => trace!("🔄️💳️ Reservation for {invoice} released"),
            Ok(false) => warn!("🔄️💳️ Reservation for {invoice} was already gone"),
            Err(e) => error!("🔄️💳️ Could not release the reservation for {invoice}. {e}"),
        }
    }

    async fn announce_checkout(&self, tx: &Transaction) {
        let user = match self.db.fetch_user(tx.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("🔄️💳️ User #{} does not exist. No checkout message for {}", tx.user_id, tx.invoice);
                return;
            },
            Err(e) => {
                error!("🔄️💳️ Could not fetch user #{} for the checkout message. {e}", tx.user_id);
                return;
            },
        };
        let message = CheckoutCreatedMessage {
            invoice: tx.invoice.clone(),
            total: tx.total,
            name: user.full_name(),
            email: user.email,
            payment_code: tx.payment_code.clone(),
            payment_method: tx.payment_method.clone(),
            expire: tx.expire_at,
        };
        self.fanout.publish_detached(BrokerEvent::new(Topic::CheckoutCreated, &message));
    }
}
