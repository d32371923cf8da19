mod expiry;
mod invoice;

pub use expiry::{compute_expiry, expiry_format, parse_gateway_time, EXPIRY_FORMAT};
pub use invoice::{InvoiceGenerator, MAX_INVOICE_ATTEMPTS};
