//! Domain models for the invoice service.

pub mod clock;
pub mod invoice;
pub mod rate;
pub mod sequence;

pub use clock::{Clock, ManualClock, SystemClock};
pub use invoice::InvoiceRecord;
pub use rate::{CachedRate, RateOrigin, RateResolution};
pub use sequence::InvoiceSequenceState;
