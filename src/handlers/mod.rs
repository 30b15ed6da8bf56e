// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod group;
pub mod practice;
pub mod profile;
pub mod ranking;
pub mod simulation;
