//! Tour bookings: checkout with payment links, payment outcomes, cancellations and refunds.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    BookingCheckout, BookingDraft, BookingStatus, CancellationOutcome, ContactInfo, SweepReport,
    TourBooking,
};
pub use router::{tour_router, TourRoutesState};
pub use service::{BookingError, TourBookingService};
