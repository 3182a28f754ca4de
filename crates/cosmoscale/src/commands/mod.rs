pub mod check;
pub mod decide;
pub mod run;
