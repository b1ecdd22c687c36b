// Person service
// Synthesizes persons and simulates a slow blocking downstream

pub mod person_service;

pub use person_service::{PersonService, MAX_ID};
