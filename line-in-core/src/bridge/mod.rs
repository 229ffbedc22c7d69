pub mod demand;
pub mod transfer_queue;
