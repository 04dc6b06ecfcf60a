pub mod portal;
pub mod universities;
