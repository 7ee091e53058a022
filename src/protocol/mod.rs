pub mod header;
pub mod tcp;
