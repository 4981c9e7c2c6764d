// Core services
pub mod batches;
pub mod planning;
pub mod reservation;
