//! Remote services hosted by the worker processes.
//!
//! Each service performs one persistence write per call and answers with a
//! status string.

mod logging;
mod reservation;

pub use logging::{LoggingService, WRITE_METHOD};
pub use reservation::{CreateReservation, ReservationService, CREATE_METHOD};
