use rand::{thread_rng, Rng};

use crate::db_types::Invoice;

/// How many candidate invoice numbers checkout will try before giving up.
pub const MAX_INVOICE_ATTEMPTS: usize = 5;

/// Produces invoice numbers of the form `INV-{user}-{school}-{salt}`.
///
/// The separators keep the candidates of different participants apart, so two invoices can only collide if they
/// belong to the same user and school. The salt is a random six-digit number, which makes that unlikely but not
/// impossible. Checkout reserves each candidate in the store before charging, and the primary key on the
/// transactions table rejects a taken one.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceGenerator;

impl InvoiceGenerator {
    const SALT_MIN: u32 = 100_000;
    const SALT_MAX: u32 = 999_999;

    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, school_id: i64, user_id: i64) -> Invoice {
        let salt = thread_rng().gen_range(Self::SALT_MIN..=Self::SALT_MAX);
        Self::with_salt(school_id, user_id, salt)
    }

    pub fn with_salt(school_id: i64, user_id: i64, salt: u32) -> Invoice {
        Invoice::new(format!("INV-{user_id}-{school_id}-{salt}"))
    }
}
