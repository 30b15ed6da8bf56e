// src/models/mod.rs

pub mod discipline;
pub mod group;
pub mod practice;
pub mod question;
pub mod simulation;
pub mod user;
