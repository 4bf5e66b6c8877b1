pub mod logs;
pub mod startup;
