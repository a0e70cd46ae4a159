pub mod projects;
pub mod setup;
pub mod standup;
pub mod tickets;
