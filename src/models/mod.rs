// Domain models
// Only one record exists in this system: the synthesized person

pub mod person;

pub use person::Person;
