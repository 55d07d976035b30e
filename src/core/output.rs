//! Unified output formatting utilities for consistent CLI presentation.
//!
//! This module provides standardized formatting functions for all git-dashboard
//! output, ensuring consistent colors, spacing, and message structure.
//!
//! # Design Principles
//! - **Consistent color scheme**: Red for errors, yellow for warnings, green for success
//! - **One message per line**: notifications from the control loop stay compact

use crate::core::progress::Level;
use colored::*;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a warning: a refused or declined operation
pub fn print_warning(message: &str) {
    println!("{} {}", "! Warning:".yellow(), message.white());
}

/// Formats and prints a success message with consistent styling
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message.white());
}

/// Formats and prints an informational message
pub fn print_info(message: &str) {
    println!("{}", message.white());
}

/// Formats and prints a section header with consistent styling
///
/// # Format
/// ```text
///
/// <header>:
///
/// ```
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// Print a notification at its level
pub fn print_notification(level: Level, message: &str) {
    match level {
        Level::Error => println!("{} {}", "✕ Error:".red(), message.white()),
        Level::Warning => print_warning(message),
        Level::Success => print_success(message),
        Level::Info => print_info(message),
    }
}
