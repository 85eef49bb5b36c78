pub mod assignments;
pub mod chat;
pub mod config;
pub mod courses;
pub mod review;
pub mod storage;
