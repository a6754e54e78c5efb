//! Terminal rendering of the thread.

use colored::Colorize;
use xinyu_core::constants::DISCLAIMER;
use xinyu_core::{Message, MessageRole, TranslationEntry, TranslationSettings};

pub fn banner() -> String {
    format!(
        "{}\n{}\n{}",
        "=== 心语咨询室 ===".bright_magenta().bold(),
        "专业恋爱情绪咨询 AI · 输入 /help 查看命令".bright_black(),
        DISCLAIMER.bright_black()
    )
}

/// Renders one message, multi-line content indented under its author.
pub fn format_message(message: &Message) -> String {
    let label = match message.role {
        MessageRole::User => "你".green().bold(),
        MessageRole::Assistant => "心语".bright_blue().bold(),
    };

    let mut out = match &message.emotion {
        Some(emotion) => format!("{} {}", label, format!("({emotion})").bright_black()),
        None => label.to_string(),
    };
    for line in message.content.lines() {
        let line = match message.role {
            MessageRole::User => line.green(),
            MessageRole::Assistant => line.bright_blue(),
        };
        out.push_str(&format!("\n  {line}"));
    }
    out
}

pub fn format_translation(entry: &TranslationEntry) -> String {
    let tag = if entry.skipped {
        format!("[{}]", entry.target_lang)
    } else {
        format!("[{} → {}]", entry.source_lang, entry.target_lang)
    };
    let mut out = format!("  {}", tag.bright_black());
    for line in entry.translated_text.lines() {
        out.push_str(&format!("\n  {}", line.italic().bright_black()));
    }
    out
}

pub fn format_settings(settings: &TranslationSettings) -> String {
    let state = if settings.enabled { "on" } else { "off" };
    format!("translation: {state}, target: {}", settings.target_language)
        .yellow()
        .to_string()
}

pub fn help() -> String {
    [
        ("/new", "开始新的对话"),
        ("/end", "删除当前对话记录并开始新的对话"),
        ("/translate", "切换翻译显示"),
        ("/lang <auto|zh-CN|en>", "设置翻译目标语言"),
        ("/history", "重新显示当前对话"),
        ("/detect <text>", "检测文本语言"),
        ("/health", "检查后端状态"),
        ("quit", "退出"),
    ]
    .iter()
    .map(|(cmd, desc)| format!("  {:<24}{}", cmd.bright_cyan(), desc))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_assistant_message_with_emotion() {
        plain();
        let msg = Message::assistant("第一行\n第二行").with_emotion(Some("sad".to_string()));
        assert_eq!(format_message(&msg), "心语 (sad)\n  第一行\n  第二行");
    }

    #[test]
    fn test_format_user_message() {
        plain();
        assert_eq!(format_message(&Message::user("你好")), "你\n  你好");
    }

    #[test]
    fn test_format_translation_tags() {
        plain();
        let mut entry = TranslationEntry {
            translated_text: "Hello".to_string(),
            source_lang: "zh-CN".to_string(),
            target_lang: "en".to_string(),
            skipped: false,
        };
        assert_eq!(format_translation(&entry), "  [zh-CN → en]\n  Hello");

        entry.skipped = true;
        assert_eq!(format_translation(&entry), "  [en]\n  Hello");
    }
}
