pub mod actions;
pub mod clipboard;
pub mod convert;
pub mod hook;
pub mod layout;
pub mod registry;
pub mod workflow;

#[cfg(test)]
mod tests;
