pub mod instrument;
pub mod price;
