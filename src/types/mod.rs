pub mod collection;
pub mod date_range;
pub mod record;
pub mod source;
