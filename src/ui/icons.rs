//! Shared UI icons.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static WAITING: Emoji<'_, '_> = Emoji("⏳ ", "[..] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

// Transcript
pub static AGENT: Emoji<'_, '_> = Emoji("🤖 ", "");
pub static AUDITOR: Emoji<'_, '_> = Emoji("🧑 ", "");
pub static COMMENT: Emoji<'_, '_> = Emoji("💬 ", "> ");

// Plan steps
pub static MAPPING: Emoji<'_, '_> = Emoji("🗂️  ", "");
pub static LOOKUP: Emoji<'_, '_> = Emoji("🔗 ", "");
pub static RULE: Emoji<'_, '_> = Emoji("🛡️  ", "");
pub static FILTER: Emoji<'_, '_> = Emoji("🔍 ", "");
pub static CALCULATION: Emoji<'_, '_> = Emoji("🧮 ", "");
pub static OUTPUT: Emoji<'_, '_> = Emoji("📤 ", "");
pub static UNKNOWN: Emoji<'_, '_> = Emoji("⚡ ", "");

pub static HISTORY: Emoji<'_, '_> = Emoji("🕘 ", "");
