pub mod drill;
pub mod hollow;
pub mod info;
