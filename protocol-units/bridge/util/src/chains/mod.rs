pub mod connector;
pub mod subscriber;
