pub mod batch;
pub mod history;
pub mod produce;
pub mod topics;
