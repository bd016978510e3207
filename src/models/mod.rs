pub mod availability;
pub mod blocked_date;
pub mod booking;
pub mod payment;
pub mod style;

pub use availability::AvailabilityRule;
pub use blocked_date::BlockedDate;
pub use booking::{Booking, BookingStatus, NewBooking};
pub use payment::{Balance, Payment, PaymentStatus, PaymentType};
pub use style::Style;
