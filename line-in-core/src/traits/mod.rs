pub mod backend;
pub mod consumer;
pub mod delegate;
