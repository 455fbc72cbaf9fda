pub mod approval;
pub mod health;
pub mod pages;
pub mod registration;
