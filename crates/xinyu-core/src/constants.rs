//! Fixed texts shown by the client.

/// Session identifier used before the backend hands out a real one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// First assistant message of a freshly started client.
pub const WELCOME_MESSAGE: &str = "你好呀！我是心语，你的情感咨询助手 💙\n\n无论是恋爱中的困惑、关系里的矛盾，还是分手后的疗愈，我都在这里陪伴你、倾听你。\n\n请放心分享你的感受，这里是安全的空间。你想聊些什么呢？";

/// Sole message of the thread after a session reset.
pub const NEW_SESSION_MESSAGE: &str = "新的对话开始了 🌸 有什么想聊的吗？";

/// Assistant message appended when the chat request fails.
pub const FALLBACK_MESSAGE: &str = "抱歉，我现在遇到了一些技术问题 😔 请稍后再试。";

/// Shown under the input line.
pub const DISCLAIMER: &str = "本 AI 助手仅供情感支持参考，不能替代专业心理咨询";
