//! Types shared across game families

mod date;

pub use self::date::{Date, DateError};
