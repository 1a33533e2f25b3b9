/// State management module
/// 
/// This module handles all application state, including:
/// - The interaction controller that owns images and prompts (controller.rs)
/// - Shared data structures (data.rs)
/// - User settings loaded from disk and environment (settings.rs)

pub mod controller;
pub mod data;
pub mod settings;
