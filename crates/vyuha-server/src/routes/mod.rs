pub mod act;
pub mod health;
pub mod insights;
pub mod scan;
pub mod spacecraft;
