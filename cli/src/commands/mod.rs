pub mod combine;
pub mod split;
