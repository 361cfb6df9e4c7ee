pub mod root;
pub mod run;
