use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CartType, CartWithSchool, Invoice, PaymentPlanType, Rupiah, SchoolPayment, Transaction},
    helpers::expiry_format,
};

pub const REGISTRATION_FEE: i64 = 200_000;
pub const REGISTRATION_ITEM: &str = "First Registration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub school_id: i64,
    /// `registration` or `herregistration`. Kept as a string so that unknown values surface as validation errors
    /// from the processor rather than as deserialization failures.
    #[serde(rename = "type")]
    pub cart_type: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub invoice: Invoice,
    pub payment_method: String,
    pub total: Rupiah,
    pub payment_code: String,
    #[serde(with = "expiry_format")]
    pub expire_date: NaiveDateTime,
}

impl From<&Transaction> for CheckoutResult {
    fn from(tx: &Transaction) -> Self {
        Self {
            invoice: tx.invoice.clone(),
            payment_method: tx.payment_method.clone(),
            total: tx.total,
            payment_code: tx.payment_code.clone(),
            expire_date: tx.expire_at,
        }
    }
}

/// What `GET /transactions/{school}` shows the applicant: the transaction they still have to pay, or else a quote for
/// the cart that is waiting for checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransactionDetail {
    Active(ActiveTransaction),
    Registration(RegistrationQuote),
    HerRegistration(HerRegistrationQuote),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveTransaction {
    pub invoice: Invoice,
    pub payment_method: String,
    pub total: Rupiah,
    pub payment_code: String,
    #[serde(with = "expiry_format")]
    pub expire: NaiveDateTime,
}

impl From<Transaction> for ActiveTransaction {
    fn from(tx: Transaction) -> Self {
        Self {
            invoice: tx.invoice,
            payment_method: tx.payment_method,
            total: tx.total,
            payment_code: tx.payment_code,
            expire: tx.expire_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationQuote {
    pub item_name: String,
    pub item_price: Rupiah,
    #[serde(rename = "type")]
    pub cart_type: CartType,
    pub total: Rupiah,
}

impl Default for RegistrationQuote {
    fn default() -> Self {
        let fee = Rupiah::from(REGISTRATION_FEE);
        Self { item_name: REGISTRATION_ITEM.to_string(), item_price: fee, cart_type: CartType::Registration, total: fee }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub name: String,
    pub price: Rupiah,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HerRegistrationQuote {
    pub one_time: Vec<QuoteLine>,
    pub interval: Vec<QuoteLine>,
    #[serde(rename = "type")]
    pub cart_type: CartType,
    pub total: Rupiah,
}

impl HerRegistrationQuote {
    pub fn from_plans(plans: &[SchoolPayment]) -> Self {
        let (one_time, interval): (Vec<_>, Vec<_>) =
            plans.iter().partition(|plan| plan.plan_type == PaymentPlanType::One);
        let line = |plan: &SchoolPayment| QuoteLine { name: plan.description.clone(), price: plan.price };
        Self {
            one_time: one_time.into_iter().map(line).collect(),
            interval: interval.into_iter().map(line).collect(),
            cart_type: CartType::HerRegistration,
            total: plans.iter().map(|p| p.price).sum(),
        }
    }
}

/// One entry in the applicant's list of open carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub school_name: String,
    pub school_image: String,
    pub school_id: i64,
    #[serde(rename = "type")]
    pub cart_type: CartType,
}

impl From<CartWithSchool> for CartSummary {
    fn from(cart: CartWithSchool) -> Self {
        Self {
            school_name: cart.school_name,
            school_image: cart.school_image,
            school_id: cart.school_id,
            cart_type: cart.cart_type,
        }
    }
}
