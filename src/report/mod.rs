//! Read side of dayscribe. Turns a day's partition plus the calendar into the two blocks of a
//! report prompt.

pub mod aggregate;
pub mod assemble;
pub mod calendar;
pub mod format;
pub mod google_auth;
pub mod google_calendar;
pub mod phrases;
pub mod template;
