//! Emoji used across the terminal output, with plain-text fallbacks.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");

pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "[ZIP]");

pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "[>]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static STOP: Emoji<'_, '_> = Emoji("🛑 ", "[STOP]");
