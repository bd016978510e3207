pub mod booking;
pub mod calendar;
pub mod email;
pub mod notification;
pub mod payments;
pub mod reconciliation;
pub mod reference;
pub mod retry;
pub mod scheduling;
