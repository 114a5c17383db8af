pub mod actions;
pub mod coordinator;
pub mod desktop;
pub mod dispatcher;
pub mod dump;
pub mod input;
pub mod payload;
pub mod text_input;
