// Input parts
pub mod keypad;
pub mod lm35;
