pub mod evaluate;
pub mod generate_script;
pub mod visualize;
