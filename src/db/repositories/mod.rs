pub mod answers;
pub mod attempts;
