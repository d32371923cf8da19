//! Data types shared by the store traits, the orchestration API and the server.
//!
//! Status-like columns are stored as plain text. Row structs decode them through `TryFrom<String>` so that an
//! unexpected value in the database surfaces as a decode error rather than being silently coerced.
use std::{fmt::Display, str::FromStr};

pub use admission_common::Rupiah;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::expiry_format;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------   ProgressStatus    ---------------------------------------------------------
/// The stage an admission application is in.
///
/// Administrators may only move an application into one of the [`ProgressStatus::ADMIN_SETTABLE`] stages. The
/// payment-driven stages (`DonePayment`, `AlreadyPaidHerRegistration` and `Failed`) are set by the webhook flow, and
/// `Submitted` is the stage every new application starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProgressStatus {
    Submitted,
    CheckFileRegistration,
    FileApproved,
    SendDetailCostsRegistration,
    FailedFileApproved,
    FailedTestResult,
    SendTestLink,
    CheckTestResult,
    TestResult,
    SendDetailCostsHerRegistration,
    Finish,
    DonePayment,
    AlreadyPaidHerRegistration,
    Failed,
}

impl ProgressStatus {
    pub const ADMIN_SETTABLE: [ProgressStatus; 10] = [
        ProgressStatus::CheckFileRegistration,
        ProgressStatus::FileApproved,
        ProgressStatus::SendDetailCostsRegistration,
        ProgressStatus::FailedFileApproved,
        ProgressStatus::FailedTestResult,
        ProgressStatus::SendTestLink,
        ProgressStatus::CheckTestResult,
        ProgressStatus::TestResult,
        ProgressStatus::SendDetailCostsHerRegistration,
        ProgressStatus::Finish,
    ];
    pub const TERMINAL: [ProgressStatus; 2] = [ProgressStatus::Finish, ProgressStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::CheckFileRegistration => "Check File Registration",
            Self::FileApproved => "File Approved",
            Self::SendDetailCostsRegistration => "Send Detail Costs Registration",
            Self::FailedFileApproved => "Failed File Approved",
            Self::FailedTestResult => "Failed Test Result",
            Self::SendTestLink => "Send Test Link",
            Self::CheckTestResult => "Check Test Result",
            Self::TestResult => "Test Result",
            Self::SendDetailCostsHerRegistration => "Send Detail Costs Her-Registration",
            Self::Finish => "Finish",
            Self::DonePayment => "Done Payment",
            Self::AlreadyPaidHerRegistration => "Already Paid Her-Registration",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    pub fn is_admin_settable(&self) -> bool {
        Self::ADMIN_SETTABLE.contains(self)
    }

    /// The cart that must be opened when an application enters this stage, if any.
    pub fn cart_to_open(&self) -> Option<CartType> {
        match self {
            Self::SendDetailCostsRegistration => Some(CartType::Registration),
            Self::SendDetailCostsHerRegistration => Some(CartType::HerRegistration),
            _ => None,
        }
    }

    /// Parses a status supplied by an administrator. Only the admin-settable stages are accepted.
    pub fn parse_admin_status(s: &str) -> Result<Self, ConversionError> {
        let status = s.parse::<Self>()?;
        if status.is_admin_settable() {
            Ok(status)
        } else {
            Err(ConversionError(format!("{s} is not an available progress status")))
        }
    }
}

impl Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submitted" => Ok(Self::Submitted),
            "Check File Registration" => Ok(Self::CheckFileRegistration),
            "File Approved" => Ok(Self::FileApproved),
            "Send Detail Costs Registration" => Ok(Self::SendDetailCostsRegistration),
            "Failed File Approved" => Ok(Self::FailedFileApproved),
            "Failed Test Result" => Ok(Self::FailedTestResult),
            "Send Test Link" => Ok(Self::SendTestLink),
            "Check Test Result" => Ok(Self::CheckTestResult),
            "Test Result" => Ok(Self::TestResult),
            "Send Detail Costs Her-Registration" => Ok(Self::SendDetailCostsHerRegistration),
            "Finish" => Ok(Self::Finish),
            "Done Payment" => Ok(Self::DonePayment),
            "Already Paid Her-Registration" => Ok(Self::AlreadyPaidHerRegistration),
            // Older rows were written with a lowercase spelling
            "Failed" | "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid progress status: {s}"))),
        }
    }
}

impl TryFrom<String> for ProgressStatus {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProgressStatus> for String {
    fn from(value: ProgressStatus) -> Self {
        value.as_str().to_string()
    }
}

//--------------------------------------      CartType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CartType {
    /// The one-off registration fee
    Registration,
    /// Re-registration ("her-registration") fees, priced from the school's payment plans
    HerRegistration,
}

impl CartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::HerRegistration => "herregistration",
        }
    }

    /// The progress stage an application moves to once a cart of this type has been paid.
    pub fn paid_status(&self) -> ProgressStatus {
        match self {
            Self::Registration => ProgressStatus::DonePayment,
            Self::HerRegistration => ProgressStatus::AlreadyPaidHerRegistration,
        }
    }
}

impl Display for CartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(Self::Registration),
            "herregistration" => Ok(Self::HerRegistration),
            s => Err(ConversionError(format!("Invalid cart type: {s}"))),
        }
    }
}

impl TryFrom<String> for CartType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CartType> for String {
    fn from(value: CartType) -> Self {
        value.as_str().to_string()
    }
}

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancel,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancel => "cancel",
        }
    }

    /// Transactions only ever move out of `pending`, and only into a settled state.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!((self, next), (Self::Pending, Self::Paid) | (Self::Pending, Self::Cancel))
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancel" => Ok(Self::Cancel),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionStatus> for String {
    fn from(value: TransactionStatus) -> Self {
        value.as_str().to_string()
    }
}

//--------------------------------------   PaymentPlanType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPlanType {
    /// Paid once
    One,
    /// Paid on a recurring schedule
    Interval,
}

impl TryFrom<String> for PaymentPlanType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "one" => Ok(Self::One),
            "interval" => Ok(Self::Interval),
            s => Err(ConversionError(format!("Invalid payment plan type: {s}"))),
        }
    }
}

//--------------------------------------       Invoice       ---------------------------------------------------------
/// The invoice number of a transaction. It is the primary key of the transactions table and the value the payment
/// gateway echoes back as `order_id` in its notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Invoice(String);

impl Invoice {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Invoice {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Invoice {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for Invoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------      Progress       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub school_id: i64,
    #[sqlx(try_from = "String")]
    pub status: ProgressStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

//--------------------------------------        Cart         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub school_id: i64,
    #[sqlx(try_from = "String")]
    pub cart_type: CartType,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// An open cart together with the school it belongs to, for cart listings.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CartWithSchool {
    pub school_id: i64,
    pub school_name: String,
    pub school_image: String,
    #[sqlx(try_from = "String")]
    pub cart_type: CartType,
}

//--------------------------------------     Transaction     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Transaction {
    pub invoice: Invoice,
    pub user_id: i64,
    pub school_id: i64,
    pub total: Rupiah,
    pub payment_code: String,
    pub payment_method: String,
    #[serde(with = "expiry_format")]
    pub expire_at: NaiveDateTime,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<TransactionItem>,
}

impl Transaction {
    pub fn with_items(mut self, items: Vec<TransactionItem>) -> Self {
        self.items = items;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct TransactionItem {
    pub id: i64,
    pub invoice: Invoice,
    pub item_name: String,
    pub item_price: Rupiah,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransactionItem {
    pub item_name: String,
    pub item_price: Rupiah,
}

impl NewTransactionItem {
    pub fn new<S: Into<String>>(item_name: S, item_price: Rupiah) -> Self {
        Self { item_name: item_name.into(), item_price }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub invoice: Invoice,
    pub user_id: i64,
    pub school_id: i64,
    pub total: Rupiah,
    pub payment_code: String,
    pub payment_method: String,
    pub expire_at: NaiveDateTime,
    pub items: Vec<NewTransactionItem>,
}

//--------------------------------------     Submission      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Submission {
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
    pub student_address: String,
    pub parent_name: String,
    pub parent_job: String,
    pub parent_religion: String,
    pub parent_phone: String,
    pub parent_signature: String,
    pub parent_address: String,
    pub submitted_on: String,
    pub created_at: DateTime<Utc>,
}

/// A submission ready to be stored. Document fields hold the object names of already-uploaded files, and address
/// fields hold serialized [`Address`] blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
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
    pub student_address: String,
    pub parent_name: String,
    pub parent_job: String,
    pub parent_religion: String,
    pub parent_phone: String,
    pub parent_signature: String,
    pub parent_address: String,
    pub submitted_on: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub province: String,
    pub city: String,
    pub district: String,
    pub village: String,
    pub zip_code: String,
    pub detail: String,
}

//--------------------------------------   Read-only lookups ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub quiz_link_pub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SchoolPayment {
    pub id: i64,
    pub school_id: i64,
    pub description: String,
    pub image: String,
    pub price: Rupiah,
    #[sqlx(try_from = "String")]
    pub plan_type: PaymentPlanType,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub sure_name: String,
    pub email: String,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.sure_name).trim().to_string()
    }
}
