mod helpers;
mod mocks;

mod notifications;
mod progress;
mod submissions;
mod transactions;
