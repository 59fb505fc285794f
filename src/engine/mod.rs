pub mod arena;
pub mod controller;
pub mod models;
pub mod profiles;
pub mod storage;
pub mod strategy;
