pub mod action;
pub mod command;
pub mod instruction;
pub mod lead;
pub mod message;
